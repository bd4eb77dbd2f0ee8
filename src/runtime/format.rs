// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Image formats accepted and produced by guest codecs.
//!
//! Formats are closed enums; each maps to statically named guest exports, so no export
//! name is ever assembled from caller input.

use crate::runtime::detector::AbiGeneration;
use crate::runtime::error::HostError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Compressed formats guests can decode.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Jpeg,
    Png,
}

impl SourceFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceFormat::Jpeg => "jpeg",
            SourceFormat::Png => "png",
        }
    }

    /// Decode export names for `generation`, in lookup order.
    ///
    /// A VecParts binary's bare `decode` export is a JPEG decoder, so it only stands in
    /// for `decode_jpeg`.
    pub fn decode_exports(self, generation: AbiGeneration) -> &'static [&'static str] {
        match (generation.uses_image_records(), self) {
            (true, SourceFormat::Jpeg) => &["jpeg_decode"],
            (true, SourceFormat::Png) => &["png_decode"],
            (false, SourceFormat::Jpeg) => &["decode_jpeg", "decode"],
            (false, SourceFormat::Png) => &["decode_png"],
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceFormat {
    type Err = HostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(SourceFormat::Jpeg),
            "png" => Ok(SourceFormat::Png),
            other => Err(HostError::ValidationError(format!(
                "unsupported source format '{}'",
                other
            ))),
        }
    }
}

/// Compressed formats guests can encode.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
    Avif,
    Webp,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
            OutputFormat::Avif => "avif",
            OutputFormat::Webp => "webp",
        }
    }

    /// Encode export names for `generation`, in lookup order.
    ///
    /// As with decoding, a bare `encode` export only stands in for `encode_jpeg`.
    pub fn encode_exports(self, generation: AbiGeneration) -> &'static [&'static str] {
        match (generation.uses_image_records(), self) {
            (true, OutputFormat::Jpeg) => &["jpeg_encode"],
            (true, OutputFormat::Png) => &["png_encode"],
            (true, OutputFormat::Avif) => &["avif_encode"],
            (true, OutputFormat::Webp) => &["webp_encode"],
            (false, OutputFormat::Jpeg) => &["encode_jpeg", "encode"],
            (false, OutputFormat::Png) => &["encode_png"],
            (false, OutputFormat::Avif) => &["encode_avif"],
            (false, OutputFormat::Webp) => &["encode_webp"],
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::Avif => "image/avif",
            OutputFormat::Webp => "image/webp",
        }
    }

    /// Conventional file extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = HostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "avif" => Ok(OutputFormat::Avif),
            "webp" => Ok(OutputFormat::Webp),
            other => Err(HostError::ValidationError(format!(
                "unsupported output format '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_formats() {
        assert_eq!("JPG".parse::<SourceFormat>().unwrap(), SourceFormat::Jpeg);
        assert_eq!("png".parse::<SourceFormat>().unwrap(), SourceFormat::Png);
        assert!("webp".parse::<SourceFormat>().is_err());
        assert_eq!("webp".parse::<OutputFormat>().unwrap(), OutputFormat::Webp);
        assert!(matches!(
            "gif".parse::<OutputFormat>(),
            Err(HostError::ValidationError(_))
        ));
    }

    #[test]
    fn test_export_names_per_generation() {
        assert_eq!(
            SourceFormat::Png.decode_exports(AbiGeneration::Context),
            &["png_decode"]
        );
        assert_eq!(
            SourceFormat::Jpeg.decode_exports(AbiGeneration::VecParts),
            &["decode_jpeg", "decode"]
        );
        assert_eq!(
            OutputFormat::Avif.encode_exports(AbiGeneration::ImageRecord),
            &["avif_encode"]
        );
        assert_eq!(
            OutputFormat::Webp.encode_exports(AbiGeneration::VecParts),
            &["encode_webp"]
        );
    }

    #[test]
    fn test_bare_vec_parts_exports_are_jpeg_only() {
        assert_eq!(
            OutputFormat::Jpeg.encode_exports(AbiGeneration::VecParts),
            &["encode_jpeg", "encode"]
        );
        assert_eq!(
            SourceFormat::Png.decode_exports(AbiGeneration::VecParts),
            &["decode_png"]
        );
        for format in [OutputFormat::Png, OutputFormat::Avif, OutputFormat::Webp] {
            let names = format.encode_exports(AbiGeneration::VecParts);
            assert!(!names.contains(&"encode"), "{} falls back to 'encode'", format);
        }
    }

    #[test]
    fn test_output_metadata() {
        assert_eq!(OutputFormat::Jpeg.extension(), "jpg");
        assert_eq!(OutputFormat::Webp.extension(), "webp");
        assert_eq!(OutputFormat::Avif.mime_type(), "image/avif");
    }

    #[test]
    fn test_serde_names_are_lowercase() {
        let format: OutputFormat = serde_yaml::from_str("avif").unwrap();
        assert_eq!(format, OutputFormat::Avif);
        assert_eq!(serde_yaml::to_string(&SourceFormat::Png).unwrap().trim(), "png");
    }
}
