mod step_service;

pub use step_service::StepService;
