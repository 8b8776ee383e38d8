use super::block::NodeHandle;
use super::error::SemicodeError;
use rand::RngCore;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

pub const DEFAULT_PAYLOAD_LEN: usize = 16;

/// Maps node handles to their byte payloads and back.
///
/// The reverse map is keyed by the exact payload bytes, so decoding the same
/// serialized payload twice always yields the same handle.
pub struct HandleRegistry {
    payloads: HashMap<NodeHandle, Vec<u8>>,
    by_payload: HashMap<Vec<u8>, NodeHandle>,
    payload_len: usize,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self {
            payloads: HashMap::new(),
            by_payload: HashMap::new(),
            payload_len: DEFAULT_PAYLOAD_LEN,
        }
    }

    /// Length of the random payload given to handles created without bytes.
    pub fn set_payload_len(&mut self, len: usize) {
        self.payload_len = len.max(1);
    }

    pub fn payload_len(&self) -> usize {
        self.payload_len
    }

    /// Allocates a fresh handle. Without `bytes`, a random payload is generated.
    pub fn create_handle(&mut self, bytes: Option<Vec<u8>>) -> NodeHandle {
        let bytes = bytes.unwrap_or_else(|| {
            let mut random = vec![0u8; self.payload_len];
            rand::thread_rng().fill_bytes(&mut random);
            random
        });
        let handle = NodeHandle::new();
        self.insert(handle, bytes);
        handle
    }

    /// Registers a handle with a fixed identity, e.g. a well-known marker.
    /// Returns false if the handle was already registered.
    pub fn register(&mut self, handle: NodeHandle, bytes: Vec<u8>) -> bool {
        if self.payloads.contains_key(&handle) {
            return false;
        }
        self.insert(handle, bytes);
        true
    }

    pub fn bytes_of(&self, handle: NodeHandle) -> Result<&[u8], SemicodeError> {
        self.payloads
            .get(&handle)
            .map(Vec::as_slice)
            .ok_or(SemicodeError::UnknownHandle(handle))
    }

    /// Existing handle whose payload equals `bytes`, or a newly registered one.
    pub fn handle_for(&mut self, bytes: &[u8]) -> NodeHandle {
        if let Some(handle) = self.by_payload.get(bytes) {
            return *handle;
        }
        let handle = NodeHandle::new();
        self.insert(handle, bytes.to_vec());
        handle
    }

    pub fn contains(&self, handle: NodeHandle) -> bool {
        self.payloads.contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }

    fn insert(&mut self, handle: NodeHandle, bytes: Vec<u8>) {
        // First registration of a payload owns the reverse entry
        if let Entry::Vacant(slot) = self.by_payload.entry(bytes.clone()) {
            slot.insert(handle);
        }
        self.payloads.insert(handle, bytes);
    }
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
