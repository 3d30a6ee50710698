//! Memory image file format.
//!
//! A simple text format:
//! - One 32-bit word per line, hex (`0x` prefix) or decimal
//! - Negative decimals are stored two's complement
//! - Anything after `;` is a comment
//! - Blank lines are ignored
//!
//! Word `n` of the file is loaded at byte address `4 * n`.

use std::io::Write;
use std::path::Path;

use thiserror::Error;

use crate::asm::disasm::disassemble_word;
use crate::word::{self, WORD_BYTES};

/// A loaded memory image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryImage {
    pub words: Vec<u32>,
}

impl MemoryImage {
    pub fn new(words: Vec<u32>) -> Self {
        Self { words }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Parse image text.
pub fn parse_image(text: &str) -> Result<MemoryImage, ImageError> {
    let mut words = Vec::new();

    for (line_num, line) in text.lines().enumerate() {
        let content = match line.find(';') {
            Some(idx) => &line[..idx],
            None => line,
        }
        .trim();

        if content.is_empty() {
            continue;
        }

        let word = parse_word(content).ok_or_else(|| ImageError::ParseError {
            line: line_num + 1,
            message: format!("expected a 32-bit word, found '{}'", content),
        })?;
        words.push(word);
    }

    Ok(MemoryImage { words })
}

fn parse_word(text: &str) -> Option<u32> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return u32::from_str_radix(hex, 16).ok();
    }
    if text.starts_with('-') {
        return text.parse::<i32>().ok().map(word::to_wire);
    }
    text.parse::<u32>().ok()
}

/// Load an image file from disk.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<MemoryImage, ImageError> {
    let text = std::fs::read_to_string(path.as_ref())
        .map_err(|e| ImageError::IoError(e.to_string()))?;
    let image = parse_image(&text)?;
    log::debug!("loaded {} words from {}", image.len(), path.as_ref().display());
    Ok(image)
}

/// Render an image as file text, with the disassembly as a comment.
pub fn format_image(image: &MemoryImage) -> String {
    let mut text = String::new();
    text.push_str("; tickcpu memory image\n");
    text.push_str(&format!("; {} words\n\n", image.len()));
    for (i, &w) in image.words.iter().enumerate() {
        text.push_str(&format!(
            "{:#010x} ; {:#06x}  {}\n",
            w,
            i as u32 * WORD_BYTES,
            disassemble_word(w)
        ));
    }
    text
}

/// Save an image file to disk.
pub fn save_image<P: AsRef<Path>>(path: P, image: &MemoryImage) -> Result<(), ImageError> {
    let mut file =
        std::fs::File::create(path.as_ref()).map_err(|e| ImageError::IoError(e.to_string()))?;
    file.write_all(format_image(image).as_bytes())
        .map_err(|e| ImageError::IoError(e.to_string()))?;
    Ok(())
}

/// Errors that can occur while reading or writing images.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("parse error on line {line}: {message}")]
    ParseError { line: usize, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_formats() {
        let text = "; header\n\n0x00019001\n17 ; halt\n-1\n";
        let image = parse_image(text).unwrap();
        assert_eq!(image.words, vec![0x0001_9001, 17, 0xFFFF_FFFF]);
    }

    #[test]
    fn test_parse_error_has_line() {
        assert_eq!(
            parse_image("17\nbogus\n"),
            Err(ImageError::ParseError {
                line: 2,
                message: "expected a 32-bit word, found 'bogus'".into()
            })
        );
    }

    #[test]
    fn test_out_of_range_word() {
        assert!(parse_image("0x100000000").is_err());
        assert!(parse_image("4294967296").is_err());
    }

    #[test]
    fn test_format_parses_back() {
        let image = MemoryImage::new(vec![0x0001_9001, 1234, 17]);
        let text = format_image(&image);
        assert!(text.contains("addi r0, 100"));
        assert_eq!(parse_image(&text).unwrap(), image);
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("tickcpu-image-{}.img", std::process::id()));
        let image = MemoryImage::new(vec![1, 2, 0xDEAD_BEEF]);
        save_image(&path, &image).unwrap();
        assert_eq!(load_image(&path).unwrap(), image);
        std::fs::remove_file(&path).unwrap();
    }
}
