pub mod api_gateway;
pub mod attempt_registry;
pub mod attempt_runner;
pub mod deadline_timer;
pub mod exam_attempt;
pub mod submission_guard;

pub use api_gateway::{ExamApi, HttpExamApi};
pub use attempt_registry::AttemptRegistry;
pub use attempt_runner::{AttemptHandle, AttemptRunner};
