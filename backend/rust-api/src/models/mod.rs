pub mod curriculum;
pub mod progress;
pub mod student;
pub mod teacher;

pub use curriculum::{Problem, Section, StageType};
pub use progress::{ProgressRecord, ProgressRollup};
pub use student::{ClassName, Student};
