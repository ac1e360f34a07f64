//! The foreign-function module `_ctypes` and its test helper.
//!
//! `_ctypes` needs libffi. The header location comes from configure when
//! known; otherwise it is searched for, and on the apple-like platform the
//! SDK's own copy is preferred. Which optional libffi entry points exist is
//! decided by grepping the installed headers.

use std::path::{Path, PathBuf};

use crate::builder::search::{self, grep_headers_for};
use crate::core::candidate::ModuleCandidate;
use crate::util::diagnostic::ConfigError;
use crate::util::fs::glob_in;

use super::DetectionContext;

/// libffi entry points probed in the headers, and the macro each enables.
const FFI_FEATURES: &[(&str, &str)] = &[
    ("ffi_prep_cif_var", "-DHAVE_FFI_PREP_CIF_VAR=1"),
    ("ffi_prep_closure_loc", "-DHAVE_FFI_PREP_CLOSURE_LOC=1"),
    ("ffi_closure_alloc", "-DHAVE_FFI_CLOSURE_ALLOC=1"),
];

pub fn detect_ctypes(ctx: &mut DetectionContext<'_>) -> Result<(), ConfigError> {
    let mut ctypes = ModuleCandidate::new(
        "_ctypes",
        [
            "_ctypes/_ctypes.c",
            "_ctypes/callbacks.c",
            "_ctypes/callproc.c",
            "_ctypes/stgdict.c",
            "_ctypes/cfield.c",
        ],
    )
    .build_last();

    if ctx.platform.is_apple() {
        ctypes.sources.push("_ctypes/malloc_closure.c".to_string());
        ctypes = ctypes
            .compile_args(["-DUSING_MALLOC_CLOSURE_DOT_C=1", "-DMACOSX"])
            .include_dirs(["_ctypes/darwin"]);
    } else if ctx.platform.host_platform() == "sunos5" {
        // parts of the bundled assembler are not position independent
        ctypes = ctypes.link_args(["-mimpure-text"]);
    } else if ctx.platform.host_platform().starts_with("hp-ux") {
        ctypes = ctypes.link_args(["-fPIC"]);
    }

    let mut ffi_inc = ctx.config.get_nonempty("LIBFFI_INCLUDEDIR");
    let mut ffi_lib: Option<&str> = None;
    let mut ffi_inc_dirs = ctx.dirs.inc_dirs.clone();

    if ctx.platform.is_apple() && ffi_inc.is_none() {
        let in_sdk = ctx.platform.sdk_root().join("usr/include/ffi");
        if in_sdk.exists() {
            ctypes = ctypes.compile_args(["-DUSING_APPLE_OS_LIBFFI=1"]);
            ffi_inc = Some(in_sdk.to_string_lossy().into_owned());
            ffi_lib = Some("ffi");
        } else {
            ffi_inc_dirs.push("/usr/include/ffi".to_string());
        }
    }

    if ffi_inc.is_none() {
        ffi_inc = search::find_file(ctx.platform, "ffi.h", &[], &ffi_inc_dirs)
            .and_then(|found| found.into_iter().next());
    }

    if let Some(inc) = ffi_inc.as_deref() {
        let ffi_h = Path::new(inc).join("ffi.h");
        if !ffi_h.exists() {
            tracing::warn!("header file {} does not exist", ffi_h.display());
            ffi_inc = None;
        }
    }

    if ffi_lib.is_none() && ffi_inc.is_some() {
        ffi_lib = ["ffi", "ffi_pic"]
            .into_iter()
            .find(|lib| ctx.find_library(lib).is_some());
    }

    if let (Some(inc), Some(lib)) = (ffi_inc, ffi_lib) {
        let headers: Vec<PathBuf> = glob_in(Path::new(&inc), "*.h");
        for (symbol, flag) in FFI_FEATURES {
            if grep_headers_for(symbol, &headers) {
                ctypes = ctypes.compile_args([*flag]);
            }
        }
        ctypes = ctypes.include_dirs([inc]).library(lib);
    } else {
        tracing::debug!("no usable libffi found");
    }

    if ctx.config.flag("HAVE_LIBDL") {
        ctypes = ctypes.library("dl");
    }

    ctx.add(ctypes);
    ctx.add_ext(ModuleCandidate::new(
        "_ctypes_test",
        ["_ctypes/_ctypes_test.c"],
    ))
}
