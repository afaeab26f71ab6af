use std::fmt;

/// A JNI version, as passed to `GetEnv` and `AttachCurrentThread`.
///
/// Versions compare in release order, so a minimum can be checked with `>=`.
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd, Ord, Eq, Hash)]
#[repr(transparent)]
pub struct JNIVersion(u32);

impl JNIVersion {
    /// JNI 1.2, the first version with `GetEnv`
    pub const V1_2: Self = Self(jni_sys::JNI_VERSION_1_2 as u32);
    /// JNI 1.4, the first version with `AttachCurrentThreadAsDaemon`
    pub const V1_4: Self = Self(jni_sys::JNI_VERSION_1_4 as u32);
    /// JNI 1.6
    pub const V1_6: Self = Self(jni_sys::JNI_VERSION_1_6 as u32);
    /// JNI 1.8
    pub const V1_8: Self = Self(jni_sys::JNI_VERSION_1_8 as u32);
    /// JNI 9
    pub const V9: Self = Self(jni_sys::JNI_VERSION_9 as u32);
    /// JNI 10
    pub const V10: Self = Self(jni_sys::JNI_VERSION_10 as u32);

    /// Wraps a raw version constant like [`jni_sys::JNI_VERSION_1_6`].
    pub fn new(ver: jni_sys::jint) -> Self {
        Self::from(ver)
    }

    /// The major component, held in the upper 16 bits.
    pub fn major(&self) -> u16 {
        (self.0 >> 16) as u16
    }

    /// The minor component, held in the lower 16 bits.
    pub fn minor(&self) -> u16 {
        self.0 as u16
    }
}

/// The version the library reports from `JNI_OnLoad` unless configured otherwise.
impl Default for JNIVersion {
    fn default() -> Self {
        JNIVersion::V1_6
    }
}

/// Formats as `major.minor`, e.g. `1.6` or `9.0`.
impl fmt::Display for JNIVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major(), self.minor())
    }
}

impl From<jni_sys::jint> for JNIVersion {
    fn from(value: jni_sys::jint) -> Self {
        Self(value as u32)
    }
}

impl From<JNIVersion> for jni_sys::jint {
    fn from(val: JNIVersion) -> Self {
        val.0 as jni_sys::jint
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn versions_display_as_major_dot_minor() {
        let displayed: Vec<String> = [
            JNIVersion::V1_2,
            JNIVersion::V1_4,
            JNIVersion::V1_6,
            JNIVersion::V1_8,
            JNIVersion::V9,
            JNIVersion::V10,
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        assert_eq!(displayed, ["1.2", "1.4", "1.6", "1.8", "9.0", "10.0"]);
    }

    #[test]
    fn raw_constants_round_trip() {
        let version = JNIVersion::new(jni_sys::JNI_VERSION_1_8);
        assert_eq!(version, JNIVersion::V1_8);
        assert_eq!(jni_sys::jint::from(version), jni_sys::JNI_VERSION_1_8);
    }

    #[test]
    fn defaults_to_1_6() {
        assert_eq!(JNIVersion::default(), JNIVersion::V1_6);
        assert!(JNIVersion::V1_8 > JNIVersion::default());
        assert!(JNIVersion::V1_4 >= JNIVersion::V1_2);
    }
}
