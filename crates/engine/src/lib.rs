pub mod event;
pub mod job_schedulers;
pub mod rule;
mod shared;
pub mod task;

pub use shared::usecase::{execute, Subscriber, UseCase};

#[cfg(test)]
mod test_utils;
