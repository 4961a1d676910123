use bstr::{BStr, BString, ByteSlice};

use fnv::FnvHashMap;

/// Maps unit accessions to the dense `usize` ids used as graph
/// vertices, and back.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct NameMap {
    pub(crate) name_map: FnvHashMap<BString, usize>,
    pub(crate) inverse_map: Vec<BString>,
}

impl NameMap {
    pub fn new() -> Self {
        Default::default()
    }

    /// Returns the id for the name, assigning the next free id if the
    /// name hasn't been seen before.
    pub fn get_or_insert<N: AsRef<[u8]>>(&mut self, name: N) -> usize {
        let name = name.as_ref();
        if let Some(ix) = self.name_map.get(name.as_bstr()) {
            return *ix;
        }
        let ix = self.inverse_map.len();
        let name = BString::from(name);
        self.name_map.insert(name.clone(), ix);
        self.inverse_map.push(name);
        ix
    }

    pub fn map_name<N: AsRef<[u8]>>(&self, name: N) -> Option<usize> {
        self.name_map.get(name.as_ref().as_bstr()).copied()
    }

    pub fn inverse_map_name(&self, id: usize) -> Option<&'_ BStr> {
        self.inverse_map.get(id).map(|bs| bs.as_bstr())
    }
}
