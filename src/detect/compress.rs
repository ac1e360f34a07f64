//! Compression libraries: `zlib`, `binascii`, `_bz2` and `_lzma`.

use crate::core::candidate::ModuleCandidate;
use crate::util::diagnostic::ConfigError;

use super::DetectionContext;

pub fn detect_compress(ctx: &mut DetectionContext<'_>) -> Result<(), ConfigError> {
    let have_zlib = ctx.config.flag("HAVE_LIBZ");
    if have_zlib {
        ctx.add(ModuleCandidate::new("zlib", ["zlibmodule.c"]).library("z"));
    } else {
        ctx.missing("zlib");
    }

    // binascii always builds; zlib only provides a faster crc32
    let mut binascii = ModuleCandidate::new("binascii", ["binascii.c"]);
    if have_zlib {
        binascii = binascii.define("USE_ZLIB_CRC32").library("z");
    }
    ctx.add(binascii);

    if ctx.config.flag("HAVE_LIBBZ2") {
        ctx.add(ModuleCandidate::new("_bz2", ["_bz2module.c"]).library("bz2"));
    } else {
        ctx.missing("_bz2");
    }

    if ctx.config.flag("HAVE_LIBLZMA") {
        ctx.add(ModuleCandidate::new("_lzma", ["_lzmamodule.c"]).library("lzma"));
    } else {
        ctx.missing("_lzma");
    }

    Ok(())
}
