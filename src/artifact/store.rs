use crate::model::FittedModel;
use crate::preprocessing::{FittedFeaturePreprocessor, FittedTransformer, PreprocessorParams};
use crate::serialization::SerializableParams;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub const MAGIC: &[u8; 6] = b"SITEML";
pub const FORMAT_VERSION: u8 = 1;
const HEADER_LEN: usize = MAGIC.len() + 2;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("corrupt artifact {}: {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },
    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ArtifactError {
    fn corrupt(path: &Path, reason: impl Into<String>) -> Self {
        ArtifactError::Corrupt {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    fn io(path: &Path, source: io::Error) -> Self {
        ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Which of the two artifacts a file holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArtifactKind {
    Preprocessor,
    Model,
}

impl ArtifactKind {
    pub fn file_name(self) -> &'static str {
        match self {
            ArtifactKind::Preprocessor => "preprocessor.bin",
            ArtifactKind::Model => "model.bin",
        }
    }

    fn tag(self) -> u8 {
        match self {
            ArtifactKind::Preprocessor => 1,
            ArtifactKind::Model => 2,
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArtifactKind::Preprocessor => "preprocessor",
            ArtifactKind::Model => "model",
        })
    }
}

/// A fitted object that can be stored as an artifact.
pub trait Artifact: Sized {
    const KIND: ArtifactKind;

    fn to_payload(&self) -> Result<Vec<u8>, String>;

    fn from_payload(bytes: &[u8]) -> Result<Self, String>;
}

impl Artifact for FittedFeaturePreprocessor {
    const KIND: ArtifactKind = ArtifactKind::Preprocessor;

    fn to_payload(&self) -> Result<Vec<u8>, String> {
        self.extract_params().to_bytes().map_err(|e| e.to_string())
    }

    fn from_payload(bytes: &[u8]) -> Result<Self, String> {
        let params = PreprocessorParams::from_bytes(bytes).map_err(|e| e.to_string())?;
        FittedFeaturePreprocessor::from_params(params).map_err(|e| e.to_string())
    }
}

impl Artifact for FittedModel {
    const KIND: ArtifactKind = ArtifactKind::Model;

    fn to_payload(&self) -> Result<Vec<u8>, String> {
        self.to_bytes().map_err(|e| e.to_string())
    }

    fn from_payload(bytes: &[u8]) -> Result<Self, String> {
        let model = FittedModel::from_bytes(bytes).map_err(|e| e.to_string())?;
        model.validate().map_err(|e| e.to_string())?;
        Ok(model)
    }
}

/// Artifact files under one directory.
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, kind: ArtifactKind) -> PathBuf {
        self.dir.join(kind.file_name())
    }

    pub fn exists(&self, kind: ArtifactKind) -> bool {
        self.path(kind).is_file()
    }

    /// Write `object`, replacing any previous artifact of the same kind.
    pub fn save<T: Artifact>(&self, object: &T) -> Result<PathBuf, ArtifactError> {
        let path = self.path(T::KIND);
        fs::create_dir_all(&self.dir).map_err(|e| ArtifactError::io(&self.dir, e))?;

        let payload = object
            .to_payload()
            .map_err(|reason| ArtifactError::corrupt(&path, reason))?;
        let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
        bytes.extend_from_slice(MAGIC);
        bytes.push(FORMAT_VERSION);
        bytes.push(T::KIND.tag());
        bytes.extend_from_slice(&payload);

        let tmp = path.with_extension("bin.tmp");
        fs::write(&tmp, &bytes).map_err(|e| ArtifactError::io(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| ArtifactError::io(&path, e))?;

        info!(kind = %T::KIND, path = %path.display(), bytes = bytes.len(), "saved artifact");
        Ok(path)
    }

    pub fn load<T: Artifact>(&self) -> Result<T, ArtifactError> {
        let path = self.path(T::KIND);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ArtifactError::NotFound(path))
            }
            Err(e) => return Err(ArtifactError::io(&path, e)),
        };

        if bytes.len() < HEADER_LEN || &bytes[..MAGIC.len()] != MAGIC {
            return Err(ArtifactError::corrupt(&path, "missing SITEML header"));
        }
        let version = bytes[MAGIC.len()];
        if version != FORMAT_VERSION {
            return Err(ArtifactError::corrupt(
                &path,
                format!("format version {version}, expected {FORMAT_VERSION}"),
            ));
        }
        let tag = bytes[MAGIC.len() + 1];
        if tag != T::KIND.tag() {
            return Err(ArtifactError::corrupt(
                &path,
                format!("kind tag {tag} is not a {} artifact", T::KIND),
            ));
        }

        let object = T::from_payload(&bytes[HEADER_LEN..])
            .map_err(|reason| ArtifactError::corrupt(&path, reason))?;
        debug!(kind = %T::KIND, path = %path.display(), "loaded artifact");
        Ok(object)
    }
}
