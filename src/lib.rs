#![doc = include_str!("../README.md")]
pub mod cache;
pub mod checksum;
pub mod chunking;
pub mod cli;
pub mod envelope;
pub mod error;
pub mod lang;
pub mod pipelines;
pub mod processing;
pub mod translate;
pub mod vocab;
