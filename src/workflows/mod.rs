pub mod acquirer;
pub mod pipeline;
pub mod resolver;
pub mod sync;

#[cfg(test)]
pub mod testing;
