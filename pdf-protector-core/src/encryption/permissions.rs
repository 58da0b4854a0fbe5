//! User access permissions (the `P` entry, ISO 32000-1 Table 22)

use bitflags::bitflags;

bitflags! {
    /// Operations a user-password holder may perform.
    ///
    /// Bit positions follow the PDF numbering (bit 1 is the lowest), so
    /// `PRINT` is bit 3.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Permissions: u32 {
        /// Bit 3: print (low quality when bit 12 is clear, revision 3+)
        const PRINT = 1 << 2;
        /// Bit 4: modify contents other than bits 6, 9 and 11
        const MODIFY_CONTENTS = 1 << 3;
        /// Bit 5: copy or extract text and graphics
        const COPY = 1 << 4;
        /// Bit 6: add or modify annotations, fill forms
        const MODIFY_ANNOTATIONS = 1 << 5;
        /// Bit 9: fill existing form fields
        const FILL_FORMS = 1 << 8;
        /// Bit 10: extract text and graphics for accessibility
        const ACCESSIBILITY = 1 << 9;
        /// Bit 11: assemble the document (insert, rotate, delete pages)
        const ASSEMBLE = 1 << 10;
        /// Bit 12: print at full quality
        const PRINT_HIGH_QUALITY = 1 << 11;
    }
}

/// Bits that must be set in every `P` value: 7, 8 and 13 to 32
const RESERVED_ONES: u32 = 0xFFFF_F0C0;

impl Permissions {
    /// Policy applied when the caller does not choose one: printing, form
    /// filling and accessibility extraction are allowed; modification,
    /// copying, annotation and assembly are denied.
    pub fn default_policy() -> Self {
        Self::PRINT | Self::PRINT_HIGH_QUALITY | Self::FILL_FORMS | Self::ACCESSIBILITY
    }

    /// Signed 32-bit value stored in the `P` entry
    pub fn to_p_value(self) -> i32 {
        (self.bits() | RESERVED_ONES) as i32
    }

    /// Interpret a `P` value, ignoring reserved bits
    pub fn from_p_value(p: i64) -> Self {
        Self::from_bits_truncate(p as u32)
    }

    /// Parse a permission name as accepted on the command line
    pub fn from_cli_name(name: &str) -> Option<Self> {
        let normalized = name.trim().to_ascii_lowercase().replace(['-', '_'], "");
        match normalized.as_str() {
            "print" => Some(Self::PRINT),
            "modify" | "modifycontents" => Some(Self::MODIFY_CONTENTS),
            "copy" | "extract" => Some(Self::COPY),
            "annotate" | "annotations" | "modifyannotations" => Some(Self::MODIFY_ANNOTATIONS),
            "fillforms" | "forms" => Some(Self::FILL_FORMS),
            "accessibility" => Some(Self::ACCESSIBILITY),
            "assemble" => Some(Self::ASSEMBLE),
            "printhq" | "printhighquality" | "printhighres" => Some(Self::PRINT_HIGH_QUALITY),
            "all" => Some(Self::all()),
            "none" => Some(Self::empty()),
            _ => None,
        }
    }

    pub fn can_print(&self) -> bool {
        self.contains(Self::PRINT)
    }

    pub fn can_modify_contents(&self) -> bool {
        self.contains(Self::MODIFY_CONTENTS)
    }

    pub fn can_copy(&self) -> bool {
        self.contains(Self::COPY)
    }

    pub fn can_modify_annotations(&self) -> bool {
        self.contains(Self::MODIFY_ANNOTATIONS)
    }

    pub fn can_fill_forms(&self) -> bool {
        self.contains(Self::FILL_FORMS)
    }

    pub fn can_access_for_accessibility(&self) -> bool {
        self.contains(Self::ACCESSIBILITY)
    }

    pub fn can_assemble(&self) -> bool {
        self.contains(Self::ASSEMBLE)
    }

    pub fn can_print_high_quality(&self) -> bool {
        self.contains(Self::PRINT_HIGH_QUALITY)
    }

    /// Named-boolean view
    pub fn flags(&self) -> PermissionFlags {
        PermissionFlags {
            print: self.can_print(),
            modify_contents: self.can_modify_contents(),
            copy: self.can_copy(),
            modify_annotations: self.can_modify_annotations(),
            fill_forms: self.can_fill_forms(),
            accessibility: self.can_access_for_accessibility(),
            assemble: self.can_assemble(),
            print_high_quality: self.can_print_high_quality(),
        }
    }

    pub fn from_flags(flags: PermissionFlags) -> Self {
        let mut permissions = Self::empty();
        permissions.set(Self::PRINT, flags.print);
        permissions.set(Self::MODIFY_CONTENTS, flags.modify_contents);
        permissions.set(Self::COPY, flags.copy);
        permissions.set(Self::MODIFY_ANNOTATIONS, flags.modify_annotations);
        permissions.set(Self::FILL_FORMS, flags.fill_forms);
        permissions.set(Self::ACCESSIBILITY, flags.accessibility);
        permissions.set(Self::ASSEMBLE, flags.assemble);
        permissions.set(Self::PRINT_HIGH_QUALITY, flags.print_high_quality);
        permissions
    }
}

/// Permission flags as named booleans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PermissionFlags {
    pub print: bool,
    pub modify_contents: bool,
    pub copy: bool,
    pub modify_annotations: bool,
    pub fill_forms: bool,
    pub accessibility: bool,
    pub assemble: bool,
    pub print_high_quality: bool,
}
