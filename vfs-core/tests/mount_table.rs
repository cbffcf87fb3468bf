use vfs_core::error::VfsErrorKind;
use vfs_core::graph::InodeGraph;
use vfs_core::mount::MountTable;

#[test]
fn longest_prefix_wins_and_respects_component_boundary() {
    let mut graph = InodeGraph::new();
    let root_a = graph.new_preopen_dir();
    let root_b = graph.new_preopen_dir();

    let mut table = MountTable::new();
    table.add_mount(b"/mnt".to_vec(), root_a, false).unwrap();
    table.add_mount(b"/mnt/nested".to_vec(), root_b, false).unwrap();

    let (mount, remainder) = table.resolve_mount(b"/mnt/nested/file").unwrap();
    assert_eq!(mount.root, root_b);
    assert_eq!(remainder, b"/file");

    let (mount, remainder) = table.resolve_mount(b"/mnt/other").unwrap();
    assert_eq!(mount.root, root_a);
    assert_eq!(remainder, b"/other");

    // "/mntx" must not match the "/mnt" prefix.
    assert!(table.resolve_mount(b"/mntx").is_none());
}

#[test]
fn duplicate_prefixes_are_rejected() {
    let mut graph = InodeGraph::new();
    let root = graph.new_preopen_dir();
    let mut table = MountTable::new();
    table.add_mount(b"/a".to_vec(), root, false).unwrap();
    let err = table.add_mount(b"/a".to_vec(), root, false).unwrap_err();
    assert_eq!(err.kind(), VfsErrorKind::Exists);
}

#[test]
fn multiple_mounts_from_one_image_are_independently_addressable() {
    // Several guest prefixes, each backed by a distinct root, independently
    // addressable from one packed image.
    let mut graph = InodeGraph::new();
    let mnt0 = graph.new_preopen_dir();
    let mnt1 = graph.new_preopen_dir();
    let name0 = vfs_core::VfsName::new(b"hello.txt").unwrap();
    let name1 = vfs_core::VfsName::new(b"goodbye.txt").unwrap();
    graph.new_file(mnt0, name0, b"from mnt0".to_vec()).unwrap();
    graph.new_file(mnt1, name1, b"from mnt1".to_vec()).unwrap();

    let mut table = MountTable::new();
    table.add_mount(b"/mnt0".to_vec(), mnt0, false).unwrap();
    table.add_mount(b"/mnt1".to_vec(), mnt1, false).unwrap();

    let (mount, remainder) = table.resolve_mount(b"/mnt1/goodbye.txt").unwrap();
    assert_eq!(remainder, b"/goodbye.txt");
    let resolved = vfs_core::path::resolve(
        &graph,
        &vfs_core::ResolveContext {
            root: mount.root,
            base: mount.root,
            follow_final_symlink: true,
            symlink_hop_bound: vfs_core::DEFAULT_SYMLINK_HOP_BOUND,
        },
        remainder,
    )
    .unwrap();
    let node = graph.link(resolved).unwrap().node;
    let mut buf = [0u8; 9];
    graph.read_at(node, 0, &mut buf).unwrap();
    assert_eq!(&buf, b"from mnt1");
}
