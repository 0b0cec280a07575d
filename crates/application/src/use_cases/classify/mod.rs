mod classify_request;

pub use classify_request::ClassifyRequestUseCase;
