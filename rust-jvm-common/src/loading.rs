use std::fmt::{Display, Formatter};

#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone)]
pub struct LoaderIndex(pub usize);

/// The loader that defined a class. Two classes are in the same runtime package only with the same loader.
#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone)]
pub enum LoaderName {
    UserDefinedLoader(LoaderIndex),
    BootstrapLoader,
}

impl Display for LoaderName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LoaderName::UserDefinedLoader(idx) => write!(f, "{}", idx.0),
            LoaderName::BootstrapLoader => write!(f, "<bl>"),
        }
    }
}

