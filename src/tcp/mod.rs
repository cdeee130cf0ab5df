pub mod config;
pub mod header;
pub mod message;
pub mod receiver;
pub mod sender;
pub mod timer;
pub mod wrap32;

// -- Re-export structs for more concise usage

pub use config::TcpConfig;
pub use header::{TcpFlags, TcpHeader};
pub use message::{TcpReceiverMessage, TcpSenderMessage};
pub use receiver::TcpReceiver;
pub use sender::TcpSender;
pub use timer::RetransmissionTimer;
pub use wrap32::Wrap32;
