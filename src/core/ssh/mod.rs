mod client;
mod scripted;

pub use client::*;
pub use scripted::{LaunchRecord, ScriptedLauncher};
