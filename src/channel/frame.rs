// Wire framing: "<m1>,<m2>,<m3>\n" in ASCII decimal, no checksum

use crate::motor::MotorVector;

/// Frame terminator
pub const TERMINATOR: u8 = b'\n';

/// Longest possible frame: "-255,-255,-255\n"
pub const MAX_FRAME_LEN: usize = 15;

/// Encode a motor vector as the text frame the board expects
pub fn encode(v: &MotorVector) -> Vec<u8> {
    format_frame(v).into_bytes()
}

/// Frame as a string (handy for logs and status messages)
pub fn format_frame(v: &MotorVector) -> String {
    format!("{},{},{}\n", v.m1(), v.m2(), v.m3())
}
