//! Genomic data structures and parsers
//!
//! This library provides reusable genomic data structures including:
//! - genomic regions and window chunking
//! - BED file format
//! - strand of alignments
//! - buffered, gzip-transparent I/O

pub mod bed;
pub mod common_io;
pub mod region;
pub mod sam;
