//! Filesystem type lookup and blacklist matching.
//!
//! Files living on pseudo or in-memory filesystems (`/proc`, `/sys`, tmpfs)
//! are not worth hashing and some of them block on read. The intake step asks
//! [`fs_type`] for the filesystem name and skips anything the
//! [`BlacklistCache`] flags.

use std::collections::HashMap;
use std::path::Path;

use super::ScanError;

/// Filesystem names skipped by default. Matching is by substring.
pub const DEFAULT_BLACKLIST: &[&str] = &["tmpfs", "sysfs", "efivarfs", "devfs", "tracefs"];

/// Look up the filesystem type name for `path`.
///
/// # Errors
///
/// Returns [`ScanError::Statfs`] if `statfs(2)` fails.
#[cfg(target_os = "linux")]
pub fn fs_type(path: &Path) -> Result<String, ScanError> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|e| ScanError::Statfs {
        path: path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, e),
    })?;

    let mut stat: libc::statfs = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::statfs(c_path.as_ptr(), &mut stat) };
    if rc != 0 {
        return Err(ScanError::Statfs {
            path: path.to_path_buf(),
            source: std::io::Error::last_os_error(),
        });
    }

    // f_type is signed on some targets; every known magic fits in 32 bits
    Ok(fs_type_name((stat.f_type as u64) & 0xFFFF_FFFF))
}

/// Look up the filesystem type name for `path`.
///
/// Only Linux exposes filesystem magic numbers; elsewhere this is `unknown`.
#[cfg(not(target_os = "linux"))]
pub fn fs_type(_path: &Path) -> Result<String, ScanError> {
    Ok("unknown".to_string())
}

/// Map a Linux filesystem magic number (see `linux/magic.h`) to a name.
#[must_use]
pub fn fs_type_name(magic: u64) -> String {
    let name = match magic {
        0x0102_1994 => "tmpfs",
        0x6265_6572 => "sysfs",
        0xEF53 => "ext2/ext3/ext4",
        0x6969 => "nfs",
        0x5846_5342 => "xfs",
        0x9123_683E => "btrfs",
        0x7371_7368 => "squashfs",
        0x137D => "ext",
        0x4244 => "hfs",
        0x4d44 => "msdos/fat",
        0x5265_4973 => "reiserfs",
        0x6165_676C => "smb",
        0xFF53_4D42 => "cifs",
        0x5346_544e => "ntfs",
        0x9fa0 => "proc",
        0x0027_e0eb => "cgroup",
        0x6367_7270 => "cgroup2",
        0x4246_5331 => "befs",
        0x1bad_face => "bfs",
        0x4249_4e4d => "binfmt_misc",
        0xcafe_4a11 => "bpf_fs",
        0x9fa1 => "openprom",
        0x5049_5045 => "pipefs",
        0x002f => "qnx4",
        0x6819_1122 => "qnx6",
        0x8584_58f6 => "ramfs",
        0x5244_5435 | 0x7275 => "romfs",
        0x6759_6969 => "rpc_pipefs",
        0x7363_6673 => "securityfs",
        0xf97c_ff8c => "selinux",
        0x4341_5d53 => "smack",
        0x534F_434B => "sockfs",
        0x7472_6163 => "tracefs",
        0x0102_1997 => "v9fs",
        0x565a_4653 => "vxfs",
        0xabba_1974 => "xenfs",
        0x012f_f7b4 => "xia",
        0x012f_f7b5 => "xiafs",
        0x012f_f7b6 => "overlay",
        0x794c_7630 => "overlayfs",
        0xaad7_aaea => "panfs",
        0x6462_6720 => "debugfs",
        0x4750_4653 => "gpfs",
        0x6a65_6a62 => "jffs2",
        0x2011_bab0 => "exfat",
        0x1983_0326 => "fhgfs",
        0x6573_5546 => "fuse",
        0x6573_5543 => "fusectl",
        0x0bad_1dea => "futexfs",
        0x4006 => "fat",
        0x4d5a => "minix",
        0x2468 | 0x2478 | 0x138F => "minix2",
        0x564c => "ncp",
        0x517b => "smb",
        0x6e73_6673 => "nsfs",
        0x5346_414F => "openafs/afs",
        0xadf5 => "adfs",
        0xadff => "affs",
        0x0187 => "autofs",
        0x6264_6576 => "bdevfs",
        0xde5e_81e4 => "efivarfs",
        0x1373 => "devfs",
        other => return format!("unknown(0x{other:x})"),
    };
    name.to_string()
}

/// Memoised blacklist check keyed by filesystem name.
///
/// A path stream usually touches a handful of filesystems, so the substring
/// scan over the blacklist runs once per distinct name.
#[derive(Debug, Clone)]
pub struct BlacklistCache {
    blacklist: Vec<String>,
    cache: HashMap<String, bool>,
}

impl Default for BlacklistCache {
    fn default() -> Self {
        Self::new(DEFAULT_BLACKLIST.iter().map(|s| (*s).to_string()).collect())
    }
}

impl BlacklistCache {
    /// Create a cache for the given blacklist entries.
    #[must_use]
    pub fn new(blacklist: Vec<String>) -> Self {
        Self {
            blacklist,
            cache: HashMap::new(),
        }
    }

    /// Whether `fstype` contains any blacklisted name.
    pub fn is_blacklisted(&mut self, fstype: &str) -> bool {
        if let Some(&hit) = self.cache.get(fstype) {
            return hit;
        }
        let hit = self
            .blacklist
            .iter()
            .any(|entry| !entry.is_empty() && fstype.contains(entry.as_str()));
        self.cache.insert(fstype.to_string(), hit);
        hit
    }

    /// Number of distinct filesystem names seen so far.
    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}
