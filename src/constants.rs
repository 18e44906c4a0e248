// Fundamental configuration constants
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_WS_PORT: u16 = 12345;
pub const DEFAULT_CHAT_PORT: u16 = 12346;
pub const DEFAULT_WS_PATH: &str = "/ws";

// Per-session outbound queue capacity
pub const DEFAULT_OUTBOUND_QUEUE: usize = 64;

// Fixed GUID every WebSocket accept token is derived from (RFC 6455 §1.3)
pub const WS_MAGIC_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

// Largest payload a single text frame may carry (16-bit extended length)
pub const MAX_FRAME_PAYLOAD: usize = 65_535;

// Nickname assigned to a freshly registered chat session
pub const DEFAULT_NICKNAME: &str = "Anonymous";

// Chat rename command prefix, trailing space included
pub const NICK_COMMAND: &str = "/nick ";
