//! Behavioral properties of the public `validate` and `format` entry points.

use libaxcfg::{
    apply_edits, format, validate, Diagnostic, FormattingOptions, Range, Severity,
};

fn errors(diagnostics: &[Diagnostic]) -> Vec<&Diagnostic> {
    diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .collect()
}

#[test]
fn test_well_ordered_blocks_have_no_structural_errors() {
    let text = "list servers = a, b\n\
                csv hosts = name\n\
                web\n\
                endcsv\n\
                for server in servers\n\
                \x20 if @{server == 'a'}\n\
                \x20   script\n\
                \x20     run();\n\
                \x20   endscript\n\
                \x20 elseif @{server == 'b'}\n\
                \x20   var x = [\n\
                \x20     1\n\
                \x20   ]\n\
                \x20   endvar\n\
                \x20 else\n\
                \x20   list y = 1,\n\
                \x20     2\n\
                \x20   endlist\n\
                \x20 endif\n\
                endfor\n";
    assert_eq!(validate(text), Vec::<Diagnostic>::new());
}

#[test]
fn test_csv_column_mismatch() {
    let text = "csv countries = name, value1, value2\n  Russia, 65, 63\n  USA, 63, 63, 63\nendcsv";
    let diagnostics = validate(text);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].severity, Severity::Error);
    assert_eq!(diagnostics[0].message, "Expected 3 columns, but found 4");
    assert_eq!(diagnostics[0].range, Range::on_line(2, 0, 17));
}

#[test]
fn test_unterminated_for() {
    let diagnostics = validate("for server in servers\n  do something\n");
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].message, "for has no matching endfor");
    assert_eq!(diagnostics[0].range, Range::on_line(0, 0, 3));
}

#[test]
fn test_name_declared_twice() {
    let diagnostics = validate("list servers = 'srv1', 'srv2'\nvar servers = 'srv1', 'srv2'\n");
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].message, "servers is already defined");
    assert_eq!(diagnostics[0].range, Range::on_line(1, 4, 11));
}

#[test]
fn test_required_setting_missing() {
    let diagnostics = validate("[series]\n   metric = hello\n");
    assert_eq!(errors(&diagnostics).len(), 1);
    assert_eq!(diagnostics[0].message, "entity is required");
    assert_eq!(diagnostics[0].range, Range::on_line(0, 1, 7));
}

#[test]
fn test_format_is_idempotent_on_canonical_text() {
    let text = "[configuration]\n\
                \x20 timespan = 1 day\n\
                [group]\n\
                \x20 [widget]\n\
                \x20   type = chart\n\
                \x20   for s in servers\n\
                \x20     [series]\n\
                \x20       entity = @{s}\n\
                \x20       metric = cpu_busy\n\
                \x20   endfor\n";
    let options = FormattingOptions {
        tab_size: 2,
        insert_spaces: true,
    };
    assert!(format(text, &options).is_empty());
}

#[test]
fn test_format_reaches_fixed_point() {
    let options = FormattingOptions::default();
    let text = "[widget]\n\
                type = chart  \n\
                \x20     list xs = a,\n\
                b\n\
                endlist\n\
                if @{x}\n\
                [series]\n\
                entity = a\n\
                \x20 else\n\
                entity = b\n\
                endif\n\
                \t\n";
    let edits = format(text, &options);
    assert!(!edits.is_empty());
    let once = apply_edits(text, &edits);
    assert!(format(&once, &options).is_empty(), "not stable:\n{}", once);
}

#[test]
fn test_validate_is_deterministic() {
    let text = "[widget]\n\
                tpye = chart\n\
                for a in lst\n\
                [series]\n\
                metric = x\n\
                metric = y\n\
                alias = m\n\
                value = value('n')\n\
                endfor\n\
                list lst = 1\n\
                list lst = 2\n";
    let first = validate(text);
    assert!(!first.is_empty());
    for _ in 0..3 {
        assert_eq!(validate(text), first);
    }
}
