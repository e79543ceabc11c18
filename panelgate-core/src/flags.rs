use bitflags::bitflags;

bitflags! {
    /// Type bits of a directory-listing entry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EntryFlags: u8 {
        const DIRECTORY = 0x01;
        const GRAPHIC   = 0x02;
        const SOUND     = 0x04;
        const TEXT      = 0x08;
        const LINK      = 0x10;
    }
}

impl EntryFlags {
    /// Classify a regular file by its extension.
    pub fn for_file_name(name: &str) -> Self {
        let ext = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "png" | "jpg" | "jpeg" | "gif" | "bmp" | "svg" => Self::GRAPHIC,
            "wav" | "mp3" | "ogg" => Self::SOUND,
            "xml" | "xma" | "txt" | "csv" | "json" => Self::TEXT,
            _ => Self::empty(),
        }
    }
}
