/// Domain models
///
/// # Models
///
/// - `user`: User accounts (`user:{id}`) and username claims (`username:{name}`)
/// - `task`: Personal task items (`todo:{id}`)

pub mod task;
pub mod user;
