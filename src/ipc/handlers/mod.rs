pub mod assignments;
pub mod backup;
pub mod categories;
pub mod core;
pub mod courses;
pub mod deletes;
pub mod marks;
pub mod students;
