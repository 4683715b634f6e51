// src/packages/rpm.rs

//! Projection of decoded header entries onto an installed package record

use crate::error::{Error, Result};
use crate::header::{IndexEntry, TagType};
use crate::packages::pgp::PgpSignature;
use crate::packages::tags::*;
use crate::packages::traits::{Dependency, DependencyType, FileInfo, PackageMetadata};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// One installed package as recorded in the rpm database
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    pub name: String,
    pub epoch: Option<i32>,
    pub version: String,
    pub release: String,
    pub arch: String,

    pub summary: String,
    pub description: String,
    pub group: String,
    pub license: String,
    pub url: String,
    pub os: String,
    pub size: i32,
    pub build_time: Option<i32>,
    pub install_time: Option<i32>,
    pub build_host: String,
    pub packager: String,

    // Provenance
    pub source_rpm: String,
    pub vendor: String,
    pub distribution: String,
    pub dist_tag: String,
    pub dist_url: String,
    pub platform: String,
    pub modularity_label: String,

    // Signatures
    pub sig_md5: String,
    pub pgp: Option<PgpSignature>,
    pub rsa_header: Option<PgpSignature>,
    pub digest_algorithm_code: Option<i32>,

    // Per-file arrays, indexed in parallel with base_names
    pub dir_indexes: Option<Vec<i32>>,
    pub dir_names: Option<Vec<String>>,
    pub base_names: Option<Vec<String>>,
    pub file_digests: Vec<String>,
    pub file_sizes: Vec<i32>,
    pub file_modes: Vec<u16>,
    pub file_flags: Vec<i32>,
    pub user_names: Vec<String>,
    pub group_names: Vec<String>,

    // Dependencies
    pub provide_names: Vec<String>,
    pub provide_versions: Vec<String>,
    pub provide_flags: Vec<i32>,
    pub require_names: Vec<String>,
    pub require_versions: Vec<String>,
    pub require_flags: Vec<i32>,
}

/// File digest algorithm codes used by rpm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DigestAlgorithm {
    Md5,
    Sha1,
    Ripemd160,
    Md2,
    Tiger192,
    Haval5_160,
    Sha256,
    Sha384,
    Sha512,
    Sha224,
}

impl DigestAlgorithm {
    pub fn from_code(code: i32) -> Result<Self> {
        Ok(match code {
            1 => DigestAlgorithm::Md5,
            2 => DigestAlgorithm::Sha1,
            3 => DigestAlgorithm::Ripemd160,
            5 => DigestAlgorithm::Md2,
            6 => DigestAlgorithm::Tiger192,
            7 => DigestAlgorithm::Haval5_160,
            8 => DigestAlgorithm::Sha256,
            9 => DigestAlgorithm::Sha384,
            10 => DigestAlgorithm::Sha512,
            11 => DigestAlgorithm::Sha224,
            other => {
                return Err(Error::UnsupportedValue(format!(
                    "file digest algorithm {}",
                    other
                )));
            }
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            DigestAlgorithm::Md5 => "MD5",
            DigestAlgorithm::Sha1 => "SHA1",
            DigestAlgorithm::Ripemd160 => "RIPEMD160",
            DigestAlgorithm::Md2 => "MD2",
            DigestAlgorithm::Tiger192 => "TIGER192",
            DigestAlgorithm::Haval5_160 => "HAVAL-5-160",
            DigestAlgorithm::Sha256 => "SHA256",
            DigestAlgorithm::Sha384 => "SHA384",
            DigestAlgorithm::Sha512 => "SHA512",
            DigestAlgorithm::Sha224 => "SHA224",
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

type Setter = fn(&mut PackageInfo, &IndexEntry<'_>) -> Result<()>;

/// How one tag is projected: the types it may carry and where it goes
struct TagSetter {
    tag: i32,
    types: &'static [TagType],
    set: Setter,
}

const STRING: &[TagType] = &[TagType::String];
const TEXT: &[TagType] = &[TagType::String, TagType::I18nString];
const STRING_ARRAY: &[TagType] = &[TagType::StringArray];
const INT16: &[TagType] = &[TagType::Int16];
const INT32: &[TagType] = &[TagType::Int32];
const BIN: &[TagType] = &[TagType::Bin];

/// Sorted by tag for binary search
static TAG_SETTERS: &[TagSetter] = &[
    TagSetter {
        tag: RPMTAG_PGP,
        types: BIN,
        set: |p, e| {
            p.pgp = Some(PgpSignature::parse(e.as_bytes())?);
            Ok(())
        },
    },
    TagSetter {
        tag: RPMTAG_SIGMD5,
        types: BIN,
        set: |p, e| {
            p.sig_md5 = e.as_bytes().iter().map(|b| format!("{:02x}", b)).collect();
            Ok(())
        },
    },
    TagSetter {
        tag: RPMTAG_RSAHEADER,
        types: BIN,
        set: |p, e| {
            p.rsa_header = Some(PgpSignature::parse(e.as_bytes())?);
            Ok(())
        },
    },
    TagSetter {
        tag: RPMTAG_NAME,
        types: STRING,
        set: |p, e| {
            p.name = e.as_string();
            Ok(())
        },
    },
    TagSetter {
        tag: RPMTAG_VERSION,
        types: STRING,
        set: |p, e| {
            p.version = e.as_string();
            Ok(())
        },
    },
    TagSetter {
        tag: RPMTAG_RELEASE,
        types: STRING,
        set: |p, e| {
            p.release = e.as_string();
            Ok(())
        },
    },
    TagSetter {
        tag: RPMTAG_EPOCH,
        types: INT32,
        set: |p, e| {
            p.epoch = Some(e.as_i32()?);
            Ok(())
        },
    },
    TagSetter {
        tag: RPMTAG_SUMMARY,
        types: TEXT,
        set: |p, e| {
            p.summary = text(e);
            Ok(())
        },
    },
    TagSetter {
        tag: RPMTAG_DESCRIPTION,
        types: TEXT,
        set: |p, e| {
            p.description = text(e);
            Ok(())
        },
    },
    TagSetter {
        tag: RPMTAG_BUILDTIME,
        types: INT32,
        set: |p, e| {
            p.build_time = Some(e.as_i32()?);
            Ok(())
        },
    },
    TagSetter {
        tag: RPMTAG_BUILDHOST,
        types: STRING,
        set: |p, e| {
            p.build_host = text(e);
            Ok(())
        },
    },
    TagSetter {
        tag: RPMTAG_INSTALLTIME,
        types: INT32,
        set: |p, e| {
            p.install_time = Some(e.as_i32()?);
            Ok(())
        },
    },
    TagSetter {
        tag: RPMTAG_SIZE,
        types: INT32,
        set: |p, e| {
            p.size = e.as_i32()?;
            Ok(())
        },
    },
    TagSetter {
        tag: RPMTAG_DISTRIBUTION,
        types: STRING,
        set: |p, e| {
            p.distribution = text(e);
            Ok(())
        },
    },
    TagSetter {
        tag: RPMTAG_VENDOR,
        types: STRING,
        set: |p, e| {
            p.vendor = text(e);
            Ok(())
        },
    },
    TagSetter {
        tag: RPMTAG_LICENSE,
        types: STRING,
        set: |p, e| {
            p.license = text(e);
            Ok(())
        },
    },
    TagSetter {
        tag: RPMTAG_PACKAGER,
        types: STRING,
        set: |p, e| {
            p.packager = text(e);
            Ok(())
        },
    },
    TagSetter {
        tag: RPMTAG_GROUP,
        types: TEXT,
        set: |p, e| {
            p.group = text(e);
            Ok(())
        },
    },
    TagSetter {
        tag: RPMTAG_URL,
        types: STRING,
        set: |p, e| {
            p.url = text(e);
            Ok(())
        },
    },
    TagSetter {
        tag: RPMTAG_OS,
        types: STRING,
        set: |p, e| {
            p.os = text(e);
            Ok(())
        },
    },
    TagSetter {
        tag: RPMTAG_ARCH,
        types: STRING,
        set: |p, e| {
            p.arch = e.as_string();
            Ok(())
        },
    },
    TagSetter {
        tag: RPMTAG_FILESIZES,
        types: INT32,
        set: |p, e| {
            p.file_sizes = e.as_i32_array()?;
            Ok(())
        },
    },
    TagSetter {
        tag: RPMTAG_FILEMODES,
        types: INT16,
        set: |p, e| {
            p.file_modes = e.as_u16_array()?;
            Ok(())
        },
    },
    TagSetter {
        tag: RPMTAG_FILEDIGESTS,
        types: STRING_ARRAY,
        set: |p, e| {
            p.file_digests = e.as_string_array();
            Ok(())
        },
    },
    TagSetter {
        tag: RPMTAG_FILEFLAGS,
        types: INT32,
        set: |p, e| {
            p.file_flags = e.as_i32_array()?;
            Ok(())
        },
    },
    TagSetter {
        tag: RPMTAG_FILEUSERNAME,
        types: STRING_ARRAY,
        set: |p, e| {
            p.user_names = e.as_string_array();
            Ok(())
        },
    },
    TagSetter {
        tag: RPMTAG_FILEGROUPNAME,
        types: STRING_ARRAY,
        set: |p, e| {
            p.group_names = e.as_string_array();
            Ok(())
        },
    },
    TagSetter {
        tag: RPMTAG_SOURCERPM,
        types: STRING,
        set: |p, e| {
            p.source_rpm = text(e);
            Ok(())
        },
    },
    TagSetter {
        tag: RPMTAG_PROVIDENAME,
        types: STRING_ARRAY,
        set: |p, e| {
            p.provide_names = e.as_string_array();
            Ok(())
        },
    },
    TagSetter {
        tag: RPMTAG_REQUIREFLAGS,
        types: INT32,
        set: |p, e| {
            p.require_flags = e.as_i32_array()?;
            Ok(())
        },
    },
    TagSetter {
        tag: RPMTAG_REQUIRENAME,
        types: STRING_ARRAY,
        set: |p, e| {
            p.require_names = e.as_string_array();
            Ok(())
        },
    },
    TagSetter {
        tag: RPMTAG_REQUIREVERSION,
        types: STRING_ARRAY,
        set: |p, e| {
            p.require_versions = e.as_string_array();
            Ok(())
        },
    },
    TagSetter {
        tag: RPMTAG_PROVIDEFLAGS,
        types: INT32,
        set: |p, e| {
            p.provide_flags = e.as_i32_array()?;
            Ok(())
        },
    },
    TagSetter {
        tag: RPMTAG_PROVIDEVERSION,
        types: STRING_ARRAY,
        set: |p, e| {
            p.provide_versions = e.as_string_array();
            Ok(())
        },
    },
    TagSetter {
        tag: RPMTAG_DIRINDEXES,
        types: INT32,
        set: |p, e| {
            p.dir_indexes = Some(e.as_i32_array()?);
            Ok(())
        },
    },
    TagSetter {
        tag: RPMTAG_BASENAMES,
        types: STRING_ARRAY,
        set: |p, e| {
            p.base_names = Some(e.as_string_array());
            Ok(())
        },
    },
    TagSetter {
        tag: RPMTAG_DIRNAMES,
        types: STRING_ARRAY,
        set: |p, e| {
            p.dir_names = Some(e.as_string_array());
            Ok(())
        },
    },
    TagSetter {
        tag: RPMTAG_DISTURL,
        types: STRING,
        set: |p, e| {
            p.dist_url = text(e);
            Ok(())
        },
    },
    TagSetter {
        tag: RPMTAG_PLATFORM,
        types: STRING,
        set: |p, e| {
            p.platform = text(e);
            Ok(())
        },
    },
    TagSetter {
        tag: RPMTAG_DISTTAG,
        types: STRING,
        set: |p, e| {
            p.dist_tag = text(e);
            Ok(())
        },
    },
    TagSetter {
        tag: RPMTAG_FILEDIGESTALGO,
        types: INT32,
        set: |p, e| {
            p.digest_algorithm_code = Some(e.as_i32()?);
            Ok(())
        },
    },
    TagSetter {
        tag: RPMTAG_MODULARITYLABEL,
        types: STRING,
        set: |p, e| {
            p.modularity_label = text(e);
            Ok(())
        },
    },
];

/// Optional text field, with rpm's `(none)` placeholder mapped to empty
fn text(entry: &IndexEntry<'_>) -> String {
    let value = entry.as_string();
    if value == "(none)" { String::new() } else { value }
}

/// Build a package record from decoded header entries
///
/// Unknown tags are ignored. A known tag carrying a type other than the
/// ones it accepts fails the whole record.
pub fn get_nevra(entries: &[IndexEntry<'_>]) -> Result<PackageInfo> {
    let mut info = PackageInfo::default();

    for entry in entries {
        let Ok(index) = TAG_SETTERS.binary_search_by_key(&entry.tag(), |s| s.tag) else {
            continue;
        };
        let setter = &TAG_SETTERS[index];

        if !setter.types.contains(&entry.tag_type) {
            let expected: Vec<String> = setter.types.iter().map(|t| t.to_string()).collect();
            return Err(Error::UnsupportedValue(format!(
                "tag {} has type {}, expected {}",
                entry.tag(),
                entry.tag_type,
                expected.join(" or ")
            )));
        }

        (setter.set)(&mut info, entry)?;
    }

    debug!("Projected package {}", info.nevra());
    Ok(info)
}

impl PackageInfo {
    /// `name-[epoch:]version-release.arch`
    pub fn nevra(&self) -> String {
        let mut nevra = format!("{}-", self.name);
        if let Some(epoch) = self.epoch {
            nevra.push_str(&format!("{}:", epoch));
        }
        nevra.push_str(&format!("{}-{}", self.version, self.release));
        if !self.arch.is_empty() {
            nevra.push('.');
            nevra.push_str(&self.arch);
        }
        nevra
    }

    /// Full paths of the installed files, in header order
    ///
    /// The directory index, directory name and base name arrays must be
    /// all present or all absent, and every index must name a directory.
    pub fn installed_file_names(&self) -> Result<Vec<String>> {
        let (dir_names, dir_indexes, base_names) =
            match (&self.dir_names, &self.dir_indexes, &self.base_names) {
                (None, None, None) => return Ok(Vec::new()),
                (Some(dir_names), Some(dir_indexes), Some(base_names)) => {
                    (dir_names, dir_indexes, base_names)
                }
                _ => {
                    return Err(Error::Format(format!(
                        "package {}: directory names, directory indexes and base names must all be present",
                        self.name
                    )));
                }
            };

        if dir_indexes.len() != base_names.len() {
            return Err(Error::Format(format!(
                "package {}: {} directory indexes for {} base names",
                self.name,
                dir_indexes.len(),
                base_names.len()
            )));
        }

        dir_indexes
            .iter()
            .zip(base_names)
            .map(|(&index, base_name)| {
                let dir = usize::try_from(index)
                    .ok()
                    .and_then(|i| dir_names.get(i))
                    .ok_or_else(|| {
                        Error::Format(format!(
                            "package {}: directory index {} out of range ({} directories)",
                            self.name,
                            index,
                            dir_names.len()
                        ))
                    })?;
                Ok(join_path(dir, base_name))
            })
            .collect()
    }

    /// Installed files with their per-file attributes
    pub fn installed_files(&self) -> Result<Vec<FileInfo>> {
        let names = self.installed_file_names()?;

        Ok(names
            .into_iter()
            .enumerate()
            .map(|(i, path)| FileInfo {
                path,
                mode: self.file_modes.get(i).copied(),
                size: self.file_sizes.get(i).copied(),
                digest: self.file_digests.get(i).filter(|d| !d.is_empty()).cloned(),
                flags: self.file_flags.get(i).copied(),
                user_name: self.user_names.get(i).cloned(),
                group_name: self.group_names.get(i).cloned(),
            })
            .collect())
    }

    /// Digest algorithm of `file_digests`, MD5 when the header names none
    pub fn digest_algorithm(&self) -> Result<DigestAlgorithm> {
        match self.digest_algorithm_code {
            Some(code) => DigestAlgorithm::from_code(code),
            None => Ok(DigestAlgorithm::Md5),
        }
    }

    pub fn requires(&self) -> Vec<Dependency> {
        dependencies(
            &self.require_names,
            &self.require_versions,
            &self.require_flags,
            DependencyType::Requires,
        )
    }

    pub fn provides(&self) -> Vec<Dependency> {
        dependencies(
            &self.provide_names,
            &self.provide_versions,
            &self.provide_flags,
            DependencyType::Provides,
        )
    }
}

fn join_path(dir: &str, base_name: &str) -> String {
    if dir.ends_with('/') {
        format!("{}{}", dir, base_name)
    } else {
        format!("{}/{}", dir, base_name)
    }
}

fn dependencies(
    names: &[String],
    versions: &[String],
    flags: &[i32],
    dep_type: DependencyType,
) -> Vec<Dependency> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| Dependency {
            name: name.clone(),
            constraint: constraint(versions.get(i), flags.get(i).copied()),
            dep_type,
        })
        .collect()
}

fn constraint(version: Option<&String>, flags: Option<i32>) -> Option<String> {
    let version = version.filter(|v| !v.is_empty())?;
    let flags = flags?;

    let mut op = String::new();
    if flags & RPMSENSE_LESS != 0 {
        op.push('<');
    }
    if flags & RPMSENSE_GREATER != 0 {
        op.push('>');
    }
    if flags & RPMSENSE_EQUAL != 0 {
        op.push('=');
    }

    if op.is_empty() {
        None
    } else {
        Some(format!("{} {}", op, version))
    }
}

impl PackageMetadata for PackageInfo {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn architecture(&self) -> Option<&str> {
        Some(self.arch.as_str()).filter(|arch| !arch.is_empty())
    }

    fn summary(&self) -> Option<&str> {
        Some(self.summary.as_str()).filter(|summary| !summary.is_empty())
    }

    fn files(&self) -> Result<Vec<FileInfo>> {
        self.installed_files()
    }

    fn dependencies(&self) -> Vec<Dependency> {
        let mut deps = self.requires();
        deps.extend(self.provides());
        deps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::header_import;
    use crate::header::testing::HeaderBuilder;

    fn project(blob: &[u8]) -> Result<PackageInfo> {
        get_nevra(&header_import(blob)?)
    }

    fn with_files(dir_names: &[&str], dir_indexes: &[i32], base_names: &[&str]) -> PackageInfo {
        PackageInfo {
            name: "test".to_string(),
            dir_names: Some(dir_names.iter().map(|s| s.to_string()).collect()),
            dir_indexes: Some(dir_indexes.to_vec()),
            base_names: Some(base_names.iter().map(|s| s.to_string()).collect()),
            ..Default::default()
        }
    }

    #[test]
    fn test_tag_setters_sorted() {
        for pair in TAG_SETTERS.windows(2) {
            assert!(pair[0].tag < pair[1].tag, "{} not before {}", pair[0].tag, pair[1].tag);
        }
    }

    #[test]
    fn test_get_nevra_identity() {
        let blob = HeaderBuilder::new()
            .string(RPMTAG_NAME, "bash")
            .string(RPMTAG_VERSION, "5.1.8")
            .string(RPMTAG_RELEASE, "6.el9")
            .i32_array(RPMTAG_EPOCH, &[1])
            .i18n_string(RPMTAG_SUMMARY, "The GNU Bourne Again shell")
            .string(RPMTAG_ARCH, "x86_64")
            .i32_array(RPMTAG_SIZE, &[7_738_634])
            .string(RPMTAG_SOURCERPM, "bash-5.1.8-6.el9.src.rpm")
            .build();

        let pkg = project(&blob).unwrap();
        assert_eq!(pkg.name, "bash");
        assert_eq!(pkg.epoch, Some(1));
        assert_eq!(pkg.summary, "The GNU Bourne Again shell");
        assert_eq!(pkg.size, 7_738_634);
        assert_eq!(pkg.source_rpm, "bash-5.1.8-6.el9.src.rpm");
        assert_eq!(pkg.nevra(), "bash-1:5.1.8-6.el9.x86_64");
    }

    #[test]
    fn test_nevra_without_epoch_or_arch() {
        let pkg = PackageInfo {
            name: "gpg-pubkey".to_string(),
            version: "fd431d51".to_string(),
            release: "4ae0493b".to_string(),
            ..Default::default()
        };
        assert_eq!(pkg.nevra(), "gpg-pubkey-fd431d51-4ae0493b");
    }

    #[test]
    fn test_none_is_normalized() {
        let mut builder = HeaderBuilder::new().string(RPMTAG_NAME, "filesystem");
        for tag in [
            RPMTAG_LICENSE,
            RPMTAG_VENDOR,
            RPMTAG_URL,
            RPMTAG_OS,
            RPMTAG_GROUP,
            RPMTAG_DISTRIBUTION,
            RPMTAG_DISTTAG,
            RPMTAG_DISTURL,
            RPMTAG_PLATFORM,
        ] {
            builder = builder.string(tag, "(none)");
        }

        let pkg = project(&builder.build()).unwrap();
        assert_eq!(pkg.license, "");
        assert_eq!(pkg.vendor, "");
        assert_eq!(pkg.url, "");
        assert_eq!(pkg.os, "");
        assert_eq!(pkg.group, "");
        assert_eq!(pkg.distribution, "");
        assert_eq!(pkg.dist_tag, "");
        assert_eq!(pkg.dist_url, "");
        assert_eq!(pkg.platform, "");
    }

    #[test]
    fn test_wrong_tag_type_rejected() {
        let blob = HeaderBuilder::new().i32_array(RPMTAG_NAME, &[5]).build();
        let result = project(&blob);
        assert!(matches!(result, Err(Error::UnsupportedValue(msg)) if msg.contains("STRING")));
    }

    #[test]
    fn test_unknown_tags_ignored() {
        let blob = HeaderBuilder::new()
            .string(RPMTAG_NAME, "zlib")
            .i32_array(1029, &[1, 2, 3])
            .build();
        assert_eq!(project(&blob).unwrap().name, "zlib");
    }

    #[test]
    fn test_dribble_value_wins() {
        let blob = HeaderBuilder::new()
            .string(RPMTAG_NAME, "openssl")
            .string(RPMTAG_LICENSE, "OpenSSL")
            .dribble()
            .string(RPMTAG_LICENSE, "Apache-2.0")
            .build();
        assert_eq!(project(&blob).unwrap().license, "Apache-2.0");
    }

    #[test]
    fn test_installed_file_names() {
        let pkg = with_files(&["/usr/", "/etc/"], &[0, 1, 0], &["bin", "conf", "lib"]);
        assert_eq!(
            pkg.installed_file_names().unwrap(),
            vec!["/usr/bin", "/etc/conf", "/usr/lib"]
        );
    }

    #[test]
    fn test_dir_without_trailing_slash() {
        let pkg = with_files(&["/opt"], &[0], &["tool"]);
        assert_eq!(pkg.installed_file_names().unwrap(), vec!["/opt/tool"]);
    }

    #[test]
    fn test_dir_index_out_of_range() {
        let pkg = with_files(&["/usr/", "/etc/"], &[0, 2], &["bin", "conf"]);
        let result = pkg.installed_file_names();
        assert!(matches!(result, Err(Error::Format(msg)) if msg.contains("out of range")));

        let pkg = with_files(&["/usr/"], &[-1], &["bin"]);
        assert!(pkg.installed_file_names().is_err());
    }

    #[test]
    fn test_index_count_mismatch() {
        let pkg = with_files(&["/usr/"], &[0, 0], &["bin"]);
        assert!(matches!(pkg.installed_file_names(), Err(Error::Format(_))));
    }

    #[test]
    fn test_partial_file_arrays_rejected() {
        let mut pkg = with_files(&["/usr/"], &[0], &["bin"]);
        pkg.dir_indexes = None;
        assert!(matches!(pkg.installed_file_names(), Err(Error::Format(_))));

        let pkg = PackageInfo::default();
        assert!(pkg.installed_file_names().unwrap().is_empty());
    }

    #[test]
    fn test_installed_files_tolerates_short_arrays() {
        let mut pkg = with_files(&["/usr/bin/"], &[0, 0], &["bash", "sh"]);
        pkg.file_modes = vec![0o100755];
        pkg.file_sizes = vec![1_389_064, 4];
        pkg.file_digests = vec!["ab12".to_string(), String::new()];
        pkg.user_names = vec!["root".to_string(), "root".to_string()];

        let files = pkg.installed_files().unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path, "/usr/bin/bash");
        assert_eq!(files[0].mode, Some(0o100755));
        assert!(files[0].is_regular());
        assert_eq!(files[0].digest.as_deref(), Some("ab12"));
        assert_eq!(files[1].mode, None);
        assert_eq!(files[1].size, Some(4));
        assert_eq!(files[1].digest, None);
        assert_eq!(files[1].group_name, None);
    }

    #[test]
    fn test_files_projected_from_header() {
        let blob = HeaderBuilder::new()
            .string(RPMTAG_NAME, "tzdata")
            .i32_array(RPMTAG_FILESIZES, &[0, 118])
            .u16_array(RPMTAG_FILEMODES, &[0o40755, 0o100644])
            .string_array(RPMTAG_FILEDIGESTS, &["", "9f86d081"])
            .string_array(RPMTAG_FILEUSERNAME, &["root", "root"])
            .string_array(RPMTAG_FILEGROUPNAME, &["root", "root"])
            .i32_array(RPMTAG_DIRINDEXES, &[0, 1])
            .string_array(RPMTAG_BASENAMES, &["zoneinfo", "UTC"])
            .string_array(RPMTAG_DIRNAMES, &["/usr/share/", "/usr/share/zoneinfo/"])
            .i32_array(RPMTAG_FILEDIGESTALGO, &[8])
            .build();

        let pkg = project(&blob).unwrap();
        let files = pkg.installed_files().unwrap();
        assert_eq!(files[0].path, "/usr/share/zoneinfo");
        assert!(!files[0].is_regular());
        assert_eq!(files[1].path, "/usr/share/zoneinfo/UTC");
        assert_eq!(files[1].size, Some(118));
        assert_eq!(pkg.digest_algorithm().unwrap(), DigestAlgorithm::Sha256);
    }

    #[test]
    fn test_digest_algorithm_default_and_unknown() {
        let mut pkg = PackageInfo::default();
        assert_eq!(pkg.digest_algorithm().unwrap(), DigestAlgorithm::Md5);

        pkg.digest_algorithm_code = Some(4);
        assert!(matches!(pkg.digest_algorithm(), Err(Error::UnsupportedValue(_))));
    }

    #[test]
    fn test_dependency_constraints() {
        let pkg = PackageInfo {
            require_names: vec![
                "glibc".to_string(),
                "/bin/sh".to_string(),
                "libc.so.6()(64bit)".to_string(),
            ],
            require_versions: vec!["2.34".to_string(), String::new(), String::new()],
            require_flags: vec![RPMSENSE_GREATER | RPMSENSE_EQUAL, 0, 0],
            provide_names: vec!["bash".to_string()],
            provide_versions: vec!["5.1.8-6.el9".to_string()],
            provide_flags: vec![RPMSENSE_EQUAL],
            ..Default::default()
        };

        let requires = pkg.requires();
        assert_eq!(requires[0].constraint.as_deref(), Some(">= 2.34"));
        assert_eq!(requires[1].constraint, None);
        assert_eq!(requires[2].dep_type, DependencyType::Requires);

        let provides = pkg.provides();
        assert_eq!(provides[0].constraint.as_deref(), Some("= 5.1.8-6.el9"));
        assert_eq!(pkg.dependencies().len(), 4);
    }

    #[test]
    fn test_signature_tags() {
        let mut pgp = vec![0x89, 0x02, 0x33, 0x04, 0x00, 0x01, 0x08];
        pgp.extend_from_slice(&[0; 17]);
        pgp.extend_from_slice(&[0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88]);
        pgp.extend_from_slice(&[0; 2]);
        pgp.extend_from_slice(&1_650_000_000i32.to_be_bytes());

        let blob = HeaderBuilder::new()
            .string(RPMTAG_NAME, "kernel")
            .bin(RPMTAG_PGP, &pgp)
            .bin(RPMTAG_SIGMD5, &[0xde, 0xad, 0xbe, 0xef])
            .bin(RPMTAG_RSAHEADER, &pgp)
            .build();

        let pkg = project(&blob).unwrap();
        assert_eq!(pkg.sig_md5, "deadbeef");
        let sig = pkg.pgp.unwrap();
        assert_eq!(sig.key_id_hex(), "1122334455667788");
        assert!(sig.to_string().starts_with("RSA/SHA256, "));
        assert_eq!(pkg.rsa_header, pkg.pgp);
    }
}
