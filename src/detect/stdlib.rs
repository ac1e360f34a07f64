//! Detectors for modules with few or no external prerequisites.

use crate::core::candidate::ModuleCandidate;
use crate::util::diagnostic::ConfigError;

use super::DetectionContext;

/// Straightforward modules that build on nearly any POSIX-like platform.
pub fn detect_simple(ctx: &mut DetectionContext<'_>) -> Result<(), ConfigError> {
    ctx.add(ModuleCandidate::new("_struct", ["_struct.c"]));
    ctx.add(ModuleCandidate::new("array", ["arraymodule.c"]));
    ctx.add(ModuleCandidate::new("_contextvars", ["_contextvarsmodule.c"]));
    ctx.add(ModuleCandidate::new("math", ["mathmodule.c"]).library("m"));
    ctx.add(ModuleCandidate::new("cmath", ["cmathmodule.c"]).library("m"));
    ctx.add_ext(ModuleCandidate::new("_datetime", ["_datetimemodule.c"]))?;

    for (name, source) in [
        ("_zoneinfo", "_zoneinfo.c"),
        ("_random", "_randommodule.c"),
        ("_bisect", "_bisectmodule.c"),
        ("_heapq", "_heapqmodule.c"),
        ("_pickle", "_pickle.c"),
        ("_json", "_json.c"),
    ] {
        ctx.add(ModuleCandidate::new(name, [source]));
    }

    ctx.add(ModuleCandidate::new("_lsprof", ["_lsprof.c", "rotatingtree.c"]));

    for (name, source) in [
        ("unicodedata", "unicodedata.c"),
        ("_opcode", "_opcode.c"),
        ("_asyncio", "_asynciomodule.c"),
        ("_queue", "_queuemodule.c"),
        ("_statistics", "_statisticsmodule.c"),
        ("_typing", "_typingmodule.c"),
    ] {
        ctx.add(ModuleCandidate::new(name, [source]));
    }

    // flock() lives in libbsd on some AIX releases
    let mut fcntl = ModuleCandidate::new("fcntl", ["fcntlmodule.c"]);
    if ctx.config_h.flag("FLOCK_NEEDS_LIBBSD") {
        fcntl = fcntl.library("bsd");
    }
    ctx.add(fcntl);

    if ctx.platform.is_vxworks() {
        ctx.not_applicable("grp");
    } else {
        ctx.add(ModuleCandidate::new("grp", ["grpmodule.c"]));
    }

    // AIX has shadow passwords but no getspent()
    if ctx.config_h.flag("HAVE_GETSPNAM") || ctx.config_h.flag("HAVE_GETSPENT") {
        ctx.add(ModuleCandidate::new("spwd", ["spwdmodule.c"]));
    } else if ctx.platform.is_aix() {
        ctx.not_applicable("spwd");
    } else {
        ctx.missing("spwd");
    }

    ctx.add(ModuleCandidate::new("select", ["selectmodule.c"]));
    ctx.add(ModuleCandidate::new("mmap", ["mmapmodule.c"]));
    ctx.add(ModuleCandidate::new("syslog", ["syslogmodule.c"]));
    ctx.add(ModuleCandidate::new(
        "_xxsubinterpreters",
        ["_xxsubinterpretersmodule.c"],
    ));
    ctx.add(ModuleCandidate::new("audioop", ["audioop.c"]).library("m"));
    ctx.add(ModuleCandidate::new("_csv", ["_csv.c"]));
    ctx.add(ModuleCandidate::new("_posixsubprocess", ["_posixsubprocess.c"]));

    Ok(())
}

/// C API test modules.
pub fn detect_test(ctx: &mut DetectionContext<'_>) -> Result<(), ConfigError> {
    ctx.add_ext(ModuleCandidate::new("_testcapi", ["_testcapimodule.c"]))?;
    ctx.add_ext(ModuleCandidate::new("_testinternalcapi", ["_testinternalcapi.c"]))?;
    ctx.add_ext(ModuleCandidate::new("_testbuffer", ["_testbuffer.c"]))?;
    ctx.add_ext(ModuleCandidate::new("_testimportmultiple", ["_testimportmultiple.c"]))?;
    ctx.add_ext(ModuleCandidate::new("_testmultiphase", ["_testmultiphase.c"]))?;
    ctx.add_ext(ModuleCandidate::new(
        "_xxtestfuzz",
        ["_xxtestfuzz/_xxtestfuzz.c", "_xxtestfuzz/fuzzer.c"],
    ))
}

/// `crypt()` is not provided on VxWorks.
pub fn detect_crypt(ctx: &mut DetectionContext<'_>) -> Result<(), ConfigError> {
    if ctx.platform.is_vxworks() {
        ctx.missing("_crypt");
        return Ok(());
    }

    let mut crypt = ModuleCandidate::new("_crypt", ["_cryptmodule.c"]);
    if ctx.find_library("crypt").is_some() {
        crypt = crypt.library("crypt");
    }
    ctx.add(crypt);
    Ok(())
}

pub fn detect_socket(ctx: &mut DetectionContext<'_>) -> Result<(), ConfigError> {
    ctx.add(ModuleCandidate::new("_socket", ["socketmodule.c"]));
    Ok(())
}

/// Built-in hash implementations, always built alongside OpenSSL.
pub fn detect_hash_builtins(ctx: &mut DetectionContext<'_>) -> Result<(), ConfigError> {
    ctx.add_ext(ModuleCandidate::new("_md5", ["md5module.c"]))?;
    ctx.add_ext(ModuleCandidate::new("_sha1", ["sha1module.c"]))?;
    ctx.add_ext(ModuleCandidate::new("_sha256", ["sha256module.c"]))?;
    ctx.add_ext(ModuleCandidate::new("_sha512", ["sha512module.c"]))?;
    ctx.add_ext(ModuleCandidate::new("_sha3", ["_sha3/sha3module.c"]))?;
    ctx.add_ext(ModuleCandidate::new(
        "_blake2",
        [
            "_blake2/blake2module.c",
            "_blake2/blake2b_impl.c",
            "_blake2/blake2s_impl.c",
        ],
    ))
}

pub fn detect_sqlite(ctx: &mut DetectionContext<'_>) -> Result<(), ConfigError> {
    ctx.add_ext(ModuleCandidate::new(
        "_sqlite3",
        [
            "_sqlite/connection.c",
            "_sqlite/cursor.c",
            "_sqlite/microprotocols.c",
            "_sqlite/module.c",
            "_sqlite/prepare_protocol.c",
            "_sqlite/row.c",
            "_sqlite/statement.c",
            "_sqlite/util.c",
        ],
    ))
}

/// Unix-only modules, the sound device module and the proxy-settings
/// module. The last two rely on configure to mark them `n/a` elsewhere.
pub fn detect_platform_specific(ctx: &mut DetectionContext<'_>) -> Result<(), ConfigError> {
    if ctx.platform.is_windows() {
        ctx.missing("resource");
        ctx.missing("termios");
    } else {
        if ctx.platform.is_vxworks() {
            ctx.not_applicable("termios");
        } else {
            ctx.add(ModuleCandidate::new("termios", ["termios.c"]));
        }
        ctx.add(ModuleCandidate::new("resource", ["resource.c"]));
    }

    ctx.add_ext(ModuleCandidate::new("ossaudiodev", ["ossaudiodev.c"]))?;
    ctx.add_ext(ModuleCandidate::new("_scproxy", ["_scproxy.c"]))
}

/// XML parser bindings; configure decides between bundled and system
/// expat through the module overrides.
pub fn detect_expat_elementtree(ctx: &mut DetectionContext<'_>) -> Result<(), ConfigError> {
    ctx.add_ext(ModuleCandidate::new("pyexpat", ["pyexpat.c"]))?;
    ctx.add_ext(ModuleCandidate::new("_elementtree", ["_elementtree.c"]))
}

/// CJK codecs.
pub fn detect_multibytecodecs(ctx: &mut DetectionContext<'_>) -> Result<(), ConfigError> {
    ctx.add(ModuleCandidate::new(
        "_multibytecodec",
        ["cjkcodecs/multibytecodec.c"],
    ));
    for loc in ["kr", "jp", "cn", "tw", "hk", "iso2022"] {
        ctx.add(ModuleCandidate::new(
            format!("_codecs_{}", loc),
            [format!("cjkcodecs/_codecs_{}.c", loc)],
        ));
    }
    Ok(())
}

pub fn detect_decimal(ctx: &mut DetectionContext<'_>) -> Result<(), ConfigError> {
    ctx.add_ext(ModuleCandidate::new("_decimal", ["_decimal/_decimal.c"]))
}

pub fn detect_uuid(ctx: &mut DetectionContext<'_>) -> Result<(), ConfigError> {
    if !ctx.config.flag("HAVE_UUID_H") && !ctx.config.flag("HAVE_UUID_UUID_H") {
        ctx.missing("_uuid");
        return Ok(());
    }

    let mut uuid = ModuleCandidate::new("_uuid", ["_uuidmodule.c"]);
    if ctx.config.flag("HAVE_LIBUUID") {
        uuid = uuid.library("uuid");
    }
    ctx.add(uuid);
    Ok(())
}

/// Limited-API samples; incompatible with reference tracing builds.
pub fn detect_limited_api(ctx: &mut DetectionContext<'_>) -> Result<(), ConfigError> {
    if ctx.config.flag("TRACE_REFS") {
        ctx.not_applicable("xxlimited");
        ctx.not_applicable("xxlimited_35");
    } else {
        ctx.add(ModuleCandidate::new("xxlimited", ["xxlimited.c"]));
        ctx.add(ModuleCandidate::new("xxlimited_35", ["xxlimited_35.c"]));
    }
    Ok(())
}
