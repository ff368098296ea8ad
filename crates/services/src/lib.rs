pub mod conversations;
pub mod detector;
pub mod generation;
pub mod messages;
pub mod routing;
pub mod search;
pub mod tools;

pub use generation::service::GenerationService;
pub use generation::GenerationRequest;

#[cfg(test)]
mod test_utils;
