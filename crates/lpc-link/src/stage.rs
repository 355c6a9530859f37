//! Pipeline stages and per-stage storage.

use core::{
    fmt,
    ops::{Index, IndexMut},
};

/// A programmable pipeline stage, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ShaderStage {
    Vertex,
    Geometry,
    Fragment,
}

impl ShaderStage {
    /// Every stage, in pipeline order.
    pub const ALL: [ShaderStage; 3] = [
        ShaderStage::Vertex,
        ShaderStage::Geometry,
        ShaderStage::Fragment,
    ];

    /// Position of the stage in the pipeline.
    pub fn index(self) -> usize {
        match self {
            ShaderStage::Vertex => 0,
            ShaderStage::Geometry => 1,
            ShaderStage::Fragment => 2,
        }
    }

    /// Lower-case stage name, as used in link diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Geometry => "geometry",
            ShaderStage::Fragment => "fragment",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One value per pipeline stage, indexed by [`ShaderStage`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PerStage<T>([T; 3]);

impl<T> PerStage<T> {
    /// Build the values from a function of the stage.
    pub fn from_fn(mut f: impl FnMut(ShaderStage) -> T) -> Self {
        PerStage([
            f(ShaderStage::Vertex),
            f(ShaderStage::Geometry),
            f(ShaderStage::Fragment),
        ])
    }

    /// Stages and their values, in pipeline order.
    pub fn iter(&self) -> impl Iterator<Item = (ShaderStage, &T)> {
        ShaderStage::ALL.into_iter().zip(self.0.iter())
    }

    /// Stages and their values, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ShaderStage, &mut T)> {
        ShaderStage::ALL.into_iter().zip(self.0.iter_mut())
    }

    /// Mutable access to two different stages at once.
    ///
    /// Returns `None` when `a == b`.
    pub fn pair_mut(&mut self, a: ShaderStage, b: ShaderStage) -> Option<(&mut T, &mut T)> {
        let (i, j) = (a.index(), b.index());
        if i == j {
            return None;
        }
        if i < j {
            let (lo, hi) = self.0.split_at_mut(j);
            Some((&mut lo[i], &mut hi[0]))
        } else {
            let (lo, hi) = self.0.split_at_mut(i);
            Some((&mut hi[0], &mut lo[j]))
        }
    }
}

impl<T> Index<ShaderStage> for PerStage<T> {
    type Output = T;

    fn index(&self, stage: ShaderStage) -> &T {
        &self.0[stage.index()]
    }
}

impl<T> IndexMut<ShaderStage> for PerStage<T> {
    fn index_mut(&mut self, stage: ShaderStage) -> &mut T {
        &mut self.0[stage.index()]
    }
}
