mod client;

pub use client::OcrClient;
