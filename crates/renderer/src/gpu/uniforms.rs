use std::collections::{BTreeMap, HashMap};

use wgpu::naga;

/// Descriptor set and binding of the uniform block both stages share.
pub(crate) const UNIFORM_GROUP: u32 = 0;
pub(crate) const UNIFORM_BINDING: u32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MemberKind {
    /// A 32-bit float scalar; the only kind the viewer writes.
    Float,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BlockMember {
    pub offset: u32,
    pub kind: MemberKind,
}

/// Member offsets of the uniform block, reflected from shader IR.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct UniformLayout {
    members: BTreeMap<String, BlockMember>,
    size: u32,
}

impl UniformLayout {
    /// Reads the block at `set = 0, binding = 0`. Returns `None` when the
    /// module declares no such block.
    pub fn reflect(module: &naga::Module) -> Option<Self> {
        let (_, global) = module.global_variables.iter().find(|(_, global)| {
            global.space == naga::AddressSpace::Uniform
                && global.binding
                    == Some(naga::ResourceBinding {
                        group: UNIFORM_GROUP,
                        binding: UNIFORM_BINDING,
                    })
        })?;

        let naga::TypeInner::Struct { members, span } = &module.types[global.ty].inner else {
            return None;
        };

        let members = members
            .iter()
            .filter_map(|member| {
                let name = member.name.clone()?;
                let kind = match module.types[member.ty].inner {
                    naga::TypeInner::Scalar(naga::Scalar {
                        kind: naga::ScalarKind::Float,
                        width: 4,
                    }) => MemberKind::Float,
                    _ => MemberKind::Other,
                };
                Some((
                    name,
                    BlockMember {
                        offset: member.offset,
                        kind,
                    },
                ))
            })
            .collect();

        Some(Self {
            members,
            size: *span,
        })
    }

    /// Combines the blocks declared by each stage. Both stages must agree on
    /// every member they both declare.
    pub fn merge(vertex: Option<Self>, fragment: Option<Self>) -> Result<Self, String> {
        match (vertex, fragment) {
            (None, None) => Ok(Self::default()),
            (Some(layout), None) | (None, Some(layout)) => Ok(layout),
            (Some(vertex), Some(fragment)) => {
                if vertex.size != fragment.size {
                    return Err(format!(
                        "uniform block size differs between stages ({} bytes in vertex, {} bytes in fragment)",
                        vertex.size, fragment.size
                    ));
                }
                for (name, member) in &fragment.members {
                    if let Some(other) = vertex.members.get(name) {
                        if other != member {
                            return Err(format!(
                                "uniform '{name}' has a different layout in the vertex and fragment stages"
                            ));
                        }
                    }
                }
                if vertex.members.len() != fragment.members.len()
                    || vertex.members.keys().any(|name| !fragment.members.contains_key(name))
                {
                    return Err(
                        "uniform block members differ between vertex and fragment stages".into(),
                    );
                }
                Ok(vertex)
            }
        }
    }

    pub fn member(&self, name: &str) -> Option<BlockMember> {
        self.members.get(name).copied()
    }

    pub fn float_names(&self) -> impl Iterator<Item = &str> {
        self.members
            .iter()
            .filter(|(_, member)| member.kind == MemberKind::Float)
            .map(|(name, _)| name.as_str())
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Buffer size rounded up to a 16 byte multiple, never zero.
    pub fn buffer_size(&self) -> u64 {
        (u64::from(self.size).max(1)).div_ceil(16) * 16
    }
}

/// Opaque handle to a float slot in the uniform block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformLocation {
    offset: usize,
}

/// CPU shadow of the uniform block plus a per-name location cache.
///
/// Names are resolved at most once per program. Names the program does not
/// declare (or declares with a non-float type) resolve to `None` and every
/// write to them is dropped.
#[derive(Debug)]
pub(crate) struct UniformCache {
    layout: UniformLayout,
    locations: HashMap<String, Option<UniformLocation>>,
    data: Vec<u8>,
    dirty: bool,
}

impl UniformCache {
    pub fn new(layout: UniformLayout) -> Self {
        let data = vec![0; layout.buffer_size() as usize];
        Self {
            layout,
            locations: HashMap::new(),
            data,
            dirty: true,
        }
    }

    pub fn location(&mut self, name: &str) -> Option<UniformLocation> {
        if let Some(cached) = self.locations.get(name) {
            return *cached;
        }
        let resolved = match self.layout.member(name) {
            Some(BlockMember {
                offset,
                kind: MemberKind::Float,
            }) => Some(UniformLocation {
                offset: offset as usize,
            }),
            Some(_) => {
                tracing::debug!(uniform = name, "uniform is not a float; writes will be ignored");
                None
            }
            None => {
                tracing::debug!(uniform = name, "uniform not declared by program; writes will be ignored");
                None
            }
        };
        self.locations.insert(name.to_string(), resolved);
        resolved
    }

    /// Writes one value. Returns whether the program declares the uniform.
    pub fn set(&mut self, name: &str, value: f32) -> bool {
        match self.location(name) {
            Some(location) => {
                self.write_at(location, value);
                true
            }
            None => false,
        }
    }

    pub fn set_uniforms<I, S>(&mut self, values: I)
    where
        I: IntoIterator<Item = (S, f32)>,
        S: AsRef<str>,
    {
        for (name, value) in values {
            self.set(name.as_ref(), value);
        }
    }

    pub fn get(&self, name: &str) -> Option<f32> {
        let location = (*self.locations.get(name)?)?;
        Some(self.read_at(location))
    }

    /// Number of names resolved so far, hits and misses alike.
    #[cfg(test)]
    pub fn cached_names(&self) -> usize {
        self.locations.len()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn buffer_size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Returns true once after any write.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    /// Copies every value written into `previous` whose name this program
    /// still declares as a float.
    pub fn carry_over(&mut self, previous: &UniformCache) {
        for (name, location) in &previous.locations {
            if let Some(location) = location {
                self.set(name, previous.read_at(*location));
            }
        }
        self.dirty = true;
    }

    fn write_at(&mut self, location: UniformLocation, value: f32) {
        self.data[location.offset..location.offset + 4].copy_from_slice(&value.to_ne_bytes());
        self.dirty = true;
    }

    fn read_at(&self, location: UniformLocation) -> f32 {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.data[location.offset..location.offset + 4]);
        f32::from_ne_bytes(bytes)
    }
}
