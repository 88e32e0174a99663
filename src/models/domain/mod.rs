pub mod attempt;
pub mod exam;

pub use attempt::{AnswerMap, AttemptPhase, Navigation, SubmissionReceipt, SubmissionState, SubmitTrigger};
pub use exam::{ExamDetail, Question};
