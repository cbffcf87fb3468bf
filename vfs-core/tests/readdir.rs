use vfs_core::graph::InodeGraph;
use vfs_core::name::VfsName;

#[test]
fn readdir_pagination_covers_all_entries_without_duplicates() {
    let mut graph = InodeGraph::new();
    let root = graph.new_preopen_dir();
    for i in 0..200 {
        let entry_name = format!("entry_{i:03}");
        graph
            .new_file(root, VfsName::new(entry_name.as_bytes()).unwrap(), Vec::new())
            .unwrap();
    }
    let dir_node = graph.link(root).unwrap().node;

    let mut seen = std::collections::HashSet::new();
    let mut cookie = 0u64;
    loop {
        let batch = graph.read_dir(dir_node, cookie, 7).unwrap();
        for entry in &batch.entries {
            assert!(
                seen.insert(entry.name.as_bytes().to_vec()),
                "duplicate entry emitted"
            );
        }
        match batch.next {
            Some(next) => {
                assert!(next > cookie || cookie == 0, "cookie must advance");
                cookie = next;
            }
            None => break,
        }
    }
    assert_eq!(seen.len(), 200);
}

#[test]
fn readdir_cookie_resumes_exactly_after_previous_entry() {
    let mut graph = InodeGraph::new();
    let root = graph.new_preopen_dir();
    for n in [b"a".as_slice(), b"b", b"c"] {
        graph.new_file(root, VfsName::new(n).unwrap(), Vec::new()).unwrap();
    }
    let dir_node = graph.link(root).unwrap().node;

    let first = graph.read_dir(dir_node, 0, 1).unwrap();
    assert_eq!(first.entries.len(), 1);
    assert_eq!(first.entries[0].name.as_bytes(), b"a");
    let cookie = first.next.unwrap();

    let second = graph.read_dir(dir_node, cookie, 1).unwrap();
    assert_eq!(second.entries.len(), 1);
    assert_eq!(second.entries[0].name.as_bytes(), b"b");
}
