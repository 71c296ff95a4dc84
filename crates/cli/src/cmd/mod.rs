mod prepare;
mod publish;

pub use prepare::cmd_prepare;
pub use publish::cmd_publish;
