pub use anyhow::{bail, ensure, format_err, Context as _, Error, Result};
pub use itertools::{izip, Itertools as _};
pub use log::{info, warn};
pub use noisy_float::prelude::*;
pub use rand::prelude::*;
pub use serde::{Deserialize, Serialize};
pub use std::{
    cmp::{self, Reverse},
    collections::HashMap,
    fmt,
    fmt::Debug,
    path::{Path, PathBuf},
    sync::Arc,
};
pub use tch::{kind::FLOAT_CPU, vision, Device, IndexOp, Kind, Tensor};
