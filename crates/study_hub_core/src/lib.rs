pub mod domain;
pub mod filter;
pub mod ports;
pub mod service;
pub mod system;
pub mod table;

pub use domain::{
    Course, CourseChanges, CourseScoped, Entity, EntityKind, Flashcard, NewCourse, NewFlashcard,
    NewQuiz, NewUser, Quiz, User,
};
pub use ports::{Clock, IdGenerator, PortError, PortResult, Table, TableId};
pub use service::{StudyHub, Tables};
pub use system::{SystemClock, UuidGenerator};
pub use table::{MemoryTable, TableBounds};
