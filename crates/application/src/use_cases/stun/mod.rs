mod classify_nat;

pub use classify_nat::ClassifyNatUseCase;
