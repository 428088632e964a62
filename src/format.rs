//! Container brand detection and metadata.

/// Number of leading bytes inspected when sniffing a stream.
pub const MAGIC_LEN: usize = 16;

/// Result of classifying the leading bytes of a stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FileType {
    /// Not an ISOBMFF container.
    No,
    /// A brand the decoder handles.
    Supported,
    /// An ISOBMFF container with a brand the decoder does not handle.
    Unsupported,
    /// Possibly decodable; the brand alone does not say.
    Maybe,
}

impl FileType {
    /// Whether a loader should claim the stream.
    pub fn is_match(self) -> bool {
        matches!(self, FileType::Supported | FileType::Maybe)
    }
}

/// Major brands found in the `ftyp` box.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HeifBrand {
    Heic,
    Heix,
    Heim,
    Heis,
    Hevc,
    Hevx,
    Hevm,
    Hevs,
    Mif1,
    Mif2,
    Msf1,
    Avif,
    Avis,
}

impl HeifBrand {
    const ALL: [HeifBrand; 13] = [
        HeifBrand::Heic,
        HeifBrand::Heix,
        HeifBrand::Heim,
        HeifBrand::Heis,
        HeifBrand::Hevc,
        HeifBrand::Hevx,
        HeifBrand::Hevm,
        HeifBrand::Hevs,
        HeifBrand::Mif1,
        HeifBrand::Mif2,
        HeifBrand::Msf1,
        HeifBrand::Avif,
        HeifBrand::Avis,
    ];

    /// The four-character code as it appears in the file.
    pub fn fourcc(self) -> &'static [u8; 4] {
        match self {
            HeifBrand::Heic => b"heic",
            HeifBrand::Heix => b"heix",
            HeifBrand::Heim => b"heim",
            HeifBrand::Heis => b"heis",
            HeifBrand::Hevc => b"hevc",
            HeifBrand::Hevx => b"hevx",
            HeifBrand::Hevm => b"hevm",
            HeifBrand::Hevs => b"hevs",
            HeifBrand::Mif1 => b"mif1",
            HeifBrand::Mif2 => b"mif2",
            HeifBrand::Msf1 => b"msf1",
            HeifBrand::Avif => b"avif",
            HeifBrand::Avis => b"avis",
        }
    }

    /// Look up a brand by its four-character code.
    pub fn from_fourcc(code: &[u8]) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.fourcc() == code)
    }

    /// Read the major brand from the start of a file.
    ///
    /// Returns None if the data is too short or does not start with `ftyp`.
    pub fn detect(data: &[u8]) -> Option<Self> {
        if data.len() < 12 || &data[4..8] != b"ftyp" {
            return None;
        }
        Self::from_fourcc(&data[8..12])
    }

    /// Whether the decoder can be expected to handle this brand.
    ///
    /// Generic brands (`mif1`, `mif2`, `msf1`) only say "some HEIF". The
    /// payload codec is only known after parsing the container.
    pub fn file_type(self) -> FileType {
        match self {
            HeifBrand::Mif1 | HeifBrand::Mif2 | HeifBrand::Msf1 => FileType::Maybe,
            _ => FileType::Supported,
        }
    }

    /// Whether the brand denotes an image sequence.
    pub fn is_sequence(self) -> bool {
        matches!(
            self,
            HeifBrand::Hevc
                | HeifBrand::Hevx
                | HeifBrand::Hevm
                | HeifBrand::Hevs
                | HeifBrand::Msf1
                | HeifBrand::Avis
        )
    }

    /// MIME type string.
    pub fn mime_type(self) -> &'static str {
        match self {
            HeifBrand::Heic | HeifBrand::Heix | HeifBrand::Heim | HeifBrand::Heis => "image/heic",
            HeifBrand::Hevc | HeifBrand::Hevx | HeifBrand::Hevm | HeifBrand::Hevs => {
                "image/heic-sequence"
            }
            HeifBrand::Mif1 | HeifBrand::Mif2 => "image/heif",
            HeifBrand::Msf1 => "image/heif-sequence",
            HeifBrand::Avif => "image/avif",
            HeifBrand::Avis => "image/avif-sequence",
        }
    }

    /// Common file extensions.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            HeifBrand::Avif | HeifBrand::Avis => &["avif"],
            HeifBrand::Mif1 | HeifBrand::Mif2 | HeifBrand::Msf1 => &["heif", "heifs", "hif"],
            _ => &["heic", "heics"],
        }
    }

    /// Guess a brand from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "heic" => Some(HeifBrand::Heic),
            "heics" => Some(HeifBrand::Hevc),
            "heif" | "hif" => Some(HeifBrand::Mif1),
            "heifs" => Some(HeifBrand::Msf1),
            "avif" => Some(HeifBrand::Avif),
            _ => None,
        }
    }
}

/// Classify the leading bytes of a file.
///
/// Matches the external library's magic-byte check so that sniffing gives
/// the same answer with or without a backend.
pub fn check_file_type(data: &[u8]) -> FileType {
    if data.len() < 8 {
        return FileType::Maybe;
    }
    if &data[4..8] != b"ftyp" {
        return FileType::No;
    }
    if data.len() < 12 {
        return FileType::Maybe;
    }
    match HeifBrand::from_fourcc(&data[8..12]) {
        Some(brand) => brand.file_type(),
        None => FileType::Unsupported,
    }
}
