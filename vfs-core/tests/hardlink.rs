use vfs_core::graph::InodeGraph;
use vfs_core::name::VfsName;

fn name(bytes: &[u8]) -> VfsName {
    VfsName::new(bytes).expect("name")
}

#[test]
fn hard_link_distinctness() {
    let mut graph = InodeGraph::new();
    let root = graph.new_preopen_dir();
    let a = graph.new_dir(root, name(b"a")).unwrap();
    let b = graph.new_dir(root, name(b"b")).unwrap();

    let x_via_a = graph.new_file(a, name(b"x"), b"payload".to_vec()).unwrap();
    let y_via_b = graph.hard_link(x_via_a, b, name(b"y")).unwrap();

    assert_eq!(graph.nlink(graph.link(x_via_a).unwrap().node).unwrap(), 2);
    assert_eq!(
        graph.link(x_via_a).unwrap().parent,
        Some(a),
        "x's own link still reports a as parent"
    );
    assert_eq!(
        graph.link(y_via_b).unwrap().parent,
        Some(b),
        "the hard link created in b reports b as parent, not a"
    );
}

#[test]
fn unlink_keeps_node_alive_while_other_link_remains() {
    let mut graph = InodeGraph::new();
    let root = graph.new_preopen_dir();
    let file = graph.new_file(root, name(b"file"), b"data".to_vec()).unwrap();
    let file2 = graph.hard_link(file, root, name(b"file2")).unwrap();

    let node = graph.link(file).unwrap().node;
    graph.remove_dirent(root, b"file").unwrap();
    graph.destroy_link(file).unwrap();

    // file2 still names the same node, bytes intact.
    let node2 = graph.link(file2).unwrap().node;
    assert_eq!(node, node2);
    let mut buf = [0u8; 4];
    graph.read_at(node2, 0, &mut buf).unwrap();
    assert_eq!(&buf, b"data");
}

#[test]
fn node_is_reaped_once_last_link_and_last_open_are_gone() {
    let mut graph = InodeGraph::new();
    let root = graph.new_preopen_dir();
    let file = graph.new_file(root, name(b"file"), b"data".to_vec()).unwrap();
    let node = graph.link(file).unwrap().node;

    graph.retain_open(node).unwrap();
    graph.remove_dirent(root, b"file").unwrap();
    graph.destroy_link(file).unwrap();
    // Still alive: an open-file description references it.
    assert!(graph.node(node).is_ok());

    graph.release_open(node).unwrap();
    assert!(graph.node(node).is_err());
}
