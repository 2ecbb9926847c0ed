use notion_docx_core::contract::MockContentSource;
use notion_docx_core::notion::{Block, BlockKind, RichTextRun};
use notion_docx_core::walker::collect_blocks;

fn list_item(id: &str, text: &str, has_children: bool) -> Block {
    Block {
        id: id.to_string(),
        block_type: "bulleted_list_item".to_string(),
        has_children,
        kind: BlockKind::BulletedListItem {
            rich_text: vec![RichTextRun::plain(text)],
        },
    }
}

fn paragraph(id: &str, text: &str, has_children: bool) -> Block {
    Block {
        id: id.to_string(),
        block_type: "paragraph".to_string(),
        has_children,
        kind: BlockKind::Paragraph {
            rich_text: vec![RichTextRun::plain(text)],
        },
    }
}

#[tokio::test]
async fn children_interleave_directly_after_their_parent() {
    let mut source = MockContentSource::new();
    source
        .expect_list_block_children()
        .returning(|container| match container {
            "page" => Ok(vec![
                list_item("item-a", "a", true),
                list_item("item-b", "b", false),
                paragraph("para-c", "c", false),
            ]),
            "item-a" => Ok(vec![
                list_item("item-a1", "a1", false),
                list_item("item-a2", "a2", false),
            ]),
            other => panic!("Unexpected container fetch: {other}"),
        });

    let placed = collect_blocks(&source, "page").await.expect("walk succeeds");

    let order: Vec<(&str, usize)> = placed
        .iter()
        .map(|p| (p.block.id.as_str(), p.depth))
        .collect();
    assert_eq!(
        order,
        vec![
            ("item-a", 0),
            ("item-a1", 1),
            ("item-a2", 1),
            ("item-b", 0),
            ("para-c", 0),
        ]
    );
}

#[tokio::test]
async fn non_list_containers_also_nest_children_one_level_deeper() {
    let mut source = MockContentSource::new();
    source
        .expect_list_block_children()
        .returning(|container| match container {
            "page" => Ok(vec![
                paragraph("outer", "outer", true),
                paragraph("sibling", "sibling", false),
            ]),
            "outer" => Ok(vec![paragraph("inner", "inner", false)]),
            other => panic!("Unexpected container fetch: {other}"),
        });

    let placed = collect_blocks(&source, "page").await.expect("walk succeeds");

    let order: Vec<(&str, usize)> = placed
        .iter()
        .map(|p| (p.block.id.as_str(), p.depth))
        .collect();
    assert_eq!(order, vec![("outer", 0), ("inner", 1), ("sibling", 0)]);
}

#[tokio::test]
async fn fetch_failure_propagates_to_the_caller() {
    let mut source = MockContentSource::new();
    source
        .expect_list_block_children()
        .returning(|_| Err("boom".into()));

    let result = collect_blocks(&source, "page").await;
    assert!(result.is_err(), "Walker should surface the fetch failure");
}
