use reportflow::compiler::captions::disambiguate;

fn owned(captions: &[&str]) -> Vec<String> {
    captions.iter().map(|c| c.to_string()).collect()
}

#[test]
fn duplicate_captions_get_numbered_suffixes() {
    let out = disambiguate(owned(&["Name", "Email", "name", "Name"]));
    assert_eq!(out, vec!["Name", "Email", "name (1)", "Name (2)"]);
}

#[test]
fn distinct_captions_are_untouched() {
    let input = owned(&["Username", "Course Name"]);
    assert_eq!(disambiguate(input.clone()), input);
}

#[test]
fn output_aliases_are_always_unique() {
    let out = disambiguate(owned(&["Email", "Email", "Email (1)", "EMAIL (1)"]));
    let mut lowered: Vec<String> = out.iter().map(|c| c.to_lowercase()).collect();
    lowered.sort();
    lowered.dedup();
    assert_eq!(lowered.len(), out.len(), "{out:?}");
    assert_eq!(out[..2], ["Email", "Email (1)"]);
}
