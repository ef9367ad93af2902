mod scanner;

pub use scanner::{
    scan_audio_tree, AudioSlot, GroupDir, ScanError, SelectedAudio, TreeScan, AUDIO_EXTENSIONS,
};
