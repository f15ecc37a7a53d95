#![allow(dead_code)]
use std::path::PathBuf;

/// The example telemetry frame from the LD2412 protocol documentation.
pub const TELEMETRY: &str = "f4f3f2f10b0002aa03780055960040780010f8f7f6f5";

pub fn fixture_path(name: &str) -> PathBuf {
    let mut path =
        PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set"));
    path.push("tests/fixtures");
    path.push(name);
    path
}

/// Build a telemetry frame with the given values; ambient light is included.
pub fn telemetry_frame(state: u8, distance_cm: u16, moving_energy: u8, still_energy: u8) -> Vec<u8> {
    let mut dat = vec![0xf4, 0xf3, 0xf2, 0xf1, 0x0b, 0x00, 0x02, 0xaa, state];
    dat.extend_from_slice(&distance_cm.to_le_bytes());
    dat.push(moving_energy);
    dat.extend_from_slice(&distance_cm.to_le_bytes());
    dat.push(still_energy);
    dat.extend_from_slice(&distance_cm.to_le_bytes());
    dat.push(0x10);
    dat.extend_from_slice(&[0xf8, 0xf7, 0xf6, 0xf5]);
    dat
}

pub fn bytes(s: &str) -> Vec<u8> {
    hex::decode(s).expect("invalid hex")
}
