#![allow(dead_code)]

use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use persistence::{
    CodecKind, SaveConfig, SaveCoordinator, SaveDocument, SaveHooks, SavePipeline,
};
use tempfile::TempDir;

pub type SharedBytes = Rc<RefCell<Vec<u8>>>;

pub fn shared(initial: &[u8]) -> SharedBytes {
    Rc::new(RefCell::new(initial.to_vec()))
}

pub fn config_in(temp: &TempDir) -> SaveConfig {
    SaveConfig::default().with_save_dir(temp.path())
}

pub fn coordinator_in(temp: &TempDir) -> SaveCoordinator {
    SaveCoordinator::new(config_in(temp)).expect("coordinator")
}

/// Registers a component whose state is a plain byte buffer shared with the test.
pub fn register_bytes(coordinator: &mut SaveCoordinator, id: &str, state: &SharedBytes) -> bool {
    let read = state.clone();
    let write = state.clone();
    coordinator.register_saveable(
        id,
        SaveHooks::new(
            move || Ok(read.borrow().clone()),
            move |bytes: &[u8]| {
                *write.borrow_mut() = bytes.to_vec();
                Ok(())
            },
        ),
    )
}

/// Decodes a slot file the way an unconfigured reader would.
pub fn read_document(path: &Path) -> SaveDocument {
    let bytes = fs::read(path).expect("read save file");
    SavePipeline::new(CodecKind::Binary.codec())
        .decode(&bytes)
        .expect("decode save file")
}

pub fn flip_last_byte(path: &Path) {
    let mut bytes = fs::read(path).expect("read");
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;
    fs::write(path, bytes).expect("write");
}

pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names = fs::read_dir(dir)
        .expect("read dir")
        .map(|entry| {
            entry
                .expect("entry")
                .file_name()
                .to_string_lossy()
                .into_owned()
        })
        .collect::<Vec<_>>();
    names.sort();
    names
}
