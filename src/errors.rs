use crate::engine::TextureHandle;
use crate::scene::NodeHandle;
use crate::utils::Rect;

#[derive(Debug, Fail)]
pub enum Error {
    #[fail(display = "{} is invalid.", _0)]
    NodeHandleInvalid(NodeHandle),
    #[fail(display = "{} is not registered.", _0)]
    NodeNotRegistered(NodeHandle),
    #[fail(display = "{} is already registered.", _0)]
    NodeAlreadyRegistered(NodeHandle),
    #[fail(display = "{} is already attached to a parent or siblings.", _0)]
    NodeAttached(NodeHandle),
    #[fail(display = "{} is not a child of {}.", child, parent)]
    NotChild {
        parent: NodeHandle,
        child: NodeHandle,
    },
    #[fail(display = "Attaching {} under {} would create a cycle.", child, parent)]
    CyclicHierarchy {
        parent: NodeHandle,
        child: NodeHandle,
    },
    #[fail(display = "{} is invalid.", _0)]
    TextureHandleInvalid(TextureHandle),
    #[fail(display = "Texture has empty dimensions ({}x{}).", _0, _1)]
    TextureEmpty(u32, u32),
    #[fail(display = "Sub-texture region {:?} is out of range.", _0)]
    RegionInvalid(Rect),
    #[fail(display = "Render can not be issued from inside an arranger.")]
    NestedRender,
    #[fail(display = "Shadow backend: {}", _0)]
    Shadow(Box<Error>),
    #[fail(display = "Failed to encode snapshot: {}", _0)]
    Encode(String),
    #[fail(display = "HTTP: {}", _0)]
    Http(String),
    #[fail(display = "IO: {}", _0)]
    Io(String),
    #[fail(display = "Invalid settings: {}", _0)]
    Settings(String),
    #[fail(display = "Lock was poisoned by a panicking thread.")]
    Poisoned,
}

pub type Result<T> = ::std::result::Result<T, Error>;

impl Error {
    /// Returns the error reported by the shadow backend, if this is one.
    pub fn shadow_cause(&self) -> Option<&Error> {
        match *self {
            Error::Shadow(ref err) => Some(err),
            _ => None,
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Error {
        Error::Encode(format!("{}", err))
    }
}

impl From<::std::io::Error> for Error {
    fn from(err: ::std::io::Error) -> Error {
        Error::Io(format!("{}", err))
    }
}

impl From<hyper::Error> for Error {
    fn from(err: hyper::Error) -> Error {
        Error::Http(format!("{}", err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::Settings(format!("{}", err))
    }
}
