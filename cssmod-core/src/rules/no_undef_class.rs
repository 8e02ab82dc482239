//! `no-undef-class`: a referenced class must be exported by its stylesheet.

use super::{Reporter, RuleListener};
use crate::cache::{ProcessedImport, ProcessedMemberAccess};

pub const RULE_NAME: &str = "no-undef-class";

const MESSAGES: &[(&str, &str)] = &[(
    "undefinedClassName",
    "{className} does not exist in {baseFilename}",
)];

#[derive(Debug, Default, Clone, Copy)]
pub struct NoUndefClass;

impl RuleListener for NoUndefClass {
    fn name(&self) -> &'static str {
        RULE_NAME
    }

    fn messages(&self) -> &'static [(&'static str, &'static str)] {
        MESSAGES
    }

    fn on_import(&mut self, import: &ProcessedImport, reporter: &mut Reporter<'_>) {
        for binding in &import.explicit_bindings {
            if !import.result.exported_classes.contains_key(&binding.imported) {
                reporter.report(
                    "undefinedClassName",
                    binding.span,
                    &[
                        ("className", binding.imported.as_str()),
                        ("baseFilename", import.base_filename.as_str()),
                    ],
                );
            }
        }
    }

    fn on_member(&mut self, access: &ProcessedMemberAccess, reporter: &mut Reporter<'_>) {
        // Leading underscore marks intentionally private lookups.
        if access.class_name.starts_with('_')
            || access.result.exported_classes.contains_key(&access.class_name)
        {
            return;
        }
        reporter.report(
            "undefinedClassName",
            access.span,
            &[
                ("className", access.class_name.as_str()),
                ("baseFilename", access.base_filename.as_str()),
            ],
        );
    }
}
