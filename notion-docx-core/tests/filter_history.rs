use notion_docx_core::filter::{
    EqualsString, FilterExpression, PropertyCondition, PropertyOperator,
};
use notion_docx_core::history::{load_history, remember, save_history};
use tempfile::tempdir;

fn priority_filter(value: &str) -> FilterExpression {
    FilterExpression::Condition(PropertyCondition {
        property: "Priority".to_string(),
        operator: PropertyOperator::Select(EqualsString {
            equals: value.to_string(),
        }),
    })
}

#[test]
fn saving_five_filters_reloads_the_last_three_in_order() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("notion_filter_history.json");

    let filters: Vec<FilterExpression> = ["Lowest", "Low", "Mid", "High", "Highest"]
        .iter()
        .map(|v| priority_filter(v))
        .collect();
    save_history(&filters, &path).unwrap();

    let reloaded: Vec<FilterExpression> = load_history(&path);
    let summaries: Vec<String> = reloaded.iter().map(FilterExpression::summary).collect();
    assert_eq!(
        summaries,
        vec!["Priority = Mid", "Priority = High", "Priority = Highest"]
    );
}

#[test]
fn reused_filters_are_not_duplicated_in_history() {
    let mut history = vec![priority_filter("High")];
    assert!(!remember(&mut history, priority_filter("High")));
    assert!(remember(&mut history, priority_filter("Low")));
    assert_eq!(history.len(), 2);
}
