// src/packages/tags.rs

//! Numeric RPM header tags read by the projector

// Signature tags as merged into the installed header
pub const RPMTAG_PGP: i32 = 259;
pub const RPMTAG_SIGMD5: i32 = 261;
pub const RPMTAG_RSAHEADER: i32 = 268;

pub const RPMTAG_NAME: i32 = 1000;
pub const RPMTAG_VERSION: i32 = 1001;
pub const RPMTAG_RELEASE: i32 = 1002;
pub const RPMTAG_EPOCH: i32 = 1003;
pub const RPMTAG_SUMMARY: i32 = 1004;
pub const RPMTAG_DESCRIPTION: i32 = 1005;
pub const RPMTAG_BUILDTIME: i32 = 1006;
pub const RPMTAG_BUILDHOST: i32 = 1007;
pub const RPMTAG_INSTALLTIME: i32 = 1008;
pub const RPMTAG_SIZE: i32 = 1009;
pub const RPMTAG_DISTRIBUTION: i32 = 1010;
pub const RPMTAG_VENDOR: i32 = 1011;
pub const RPMTAG_LICENSE: i32 = 1014;
pub const RPMTAG_PACKAGER: i32 = 1015;
pub const RPMTAG_GROUP: i32 = 1016;
pub const RPMTAG_URL: i32 = 1020;
pub const RPMTAG_OS: i32 = 1021;
pub const RPMTAG_ARCH: i32 = 1022;

pub const RPMTAG_FILESIZES: i32 = 1028;
pub const RPMTAG_FILEMODES: i32 = 1030;
pub const RPMTAG_FILEDIGESTS: i32 = 1035;
pub const RPMTAG_FILEFLAGS: i32 = 1037;
pub const RPMTAG_FILEUSERNAME: i32 = 1039;
pub const RPMTAG_FILEGROUPNAME: i32 = 1040;

pub const RPMTAG_SOURCERPM: i32 = 1044;
pub const RPMTAG_PROVIDENAME: i32 = 1047;
pub const RPMTAG_REQUIREFLAGS: i32 = 1048;
pub const RPMTAG_REQUIRENAME: i32 = 1049;
pub const RPMTAG_REQUIREVERSION: i32 = 1050;
pub const RPMTAG_PROVIDEFLAGS: i32 = 1112;
pub const RPMTAG_PROVIDEVERSION: i32 = 1113;

pub const RPMTAG_DIRINDEXES: i32 = 1116;
pub const RPMTAG_BASENAMES: i32 = 1117;
pub const RPMTAG_DIRNAMES: i32 = 1118;

pub const RPMTAG_DISTURL: i32 = 1123;
pub const RPMTAG_PLATFORM: i32 = 1132;
pub const RPMTAG_DISTTAG: i32 = 1155;
pub const RPMTAG_FILEDIGESTALGO: i32 = 5011;
pub const RPMTAG_MODULARITYLABEL: i32 = 5096;

// Dependency comparison bits
pub const RPMSENSE_LESS: i32 = 0x02;
pub const RPMSENSE_GREATER: i32 = 0x04;
pub const RPMSENSE_EQUAL: i32 = 0x08;

/// File flag marking a `%ghost` file, which is not shipped in the payload
pub const RPMFILE_GHOST: i32 = 0x40;

pub const S_IFMT: u16 = 0o170000;
pub const S_IFREG: u16 = 0o100000;
