// Mappers module - upstream payload shaping

pub mod inspection;
pub mod task_update;
