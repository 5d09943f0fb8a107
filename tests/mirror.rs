extern crate env_logger;
extern crate image;
extern crate rand;
extern crate sprite_mirror;

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use image::{Rgba, RgbaImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use sprite_mirror::math::Vector2;
use sprite_mirror::prelude::*;

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

fn params(w: u32, h: u32) -> MirrorParams {
    MirrorParams {
        dimensions: Vector2::new(w, h),
        background: Color::white(),
    }
}

fn headless_mirror(w: u32, h: u32) -> MirrorEngine<HeadlessEngine> {
    let _ = env_logger::builder().is_test(true).try_init();
    MirrorEngine::new(HeadlessEngine::new(), &params(w, h)).unwrap()
}

fn render<P: Engine>(mirror: &mut MirrorEngine<P>, scene: &mut Scene, root: NodeHandle, t: i32) {
    mirror
        .render(scene, root, Time(t), &DisplayConfig::default())
        .unwrap();
}

/// Links of `n` as a renderer walks them, stepping over unregistered nodes.
fn walked_links(scene: &Scene, n: NodeHandle, registered: &HashSet<NodeHandle>) -> Links {
    let nearest = |mut cursor: Option<NodeHandle>, forward: bool| -> Option<NodeHandle> {
        while let Some(v) = cursor {
            if registered.contains(&v) {
                return Some(v);
            }

            cursor = if forward {
                scene.next_sibling(v)
            } else {
                scene.prev_sibling(v)
            };
        }

        None
    };

    let links = scene.links(n).unwrap();
    Links {
        parent: links.parent.filter(|v| registered.contains(v)),
        first_child: nearest(links.first_child, true),
        last_child: nearest(links.last_child, false),
        prev_sib: nearest(links.prev_sib, false),
        next_sib: nearest(links.next_sib, true),
    }
}

fn check_topology(
    scene: &Scene,
    mirror: &MirrorEngine<SoftwareEngine>,
    nodes: &[NodeHandle],
    registered: &HashSet<NodeHandle>,
) {
    let mut shadows = HashSet::new();

    for &n in nodes {
        let shadow = mirror.shadow_node(n).unwrap();
        if !registered.contains(&n) {
            assert_eq!(shadow, None);
            assert!(!mirror.primary().is_registered(n));
            continue;
        }

        let shadow = shadow.unwrap();
        assert!(shadows.insert(shadow));
        assert!(mirror.primary().is_registered(n));
        assert!(mirror
            .with_shadow_engine(|v| v.is_registered(shadow))
            .unwrap());

        let expected = walked_links(scene, n, registered).map(|v| mirror.shadow_node(v).unwrap());
        assert_eq!(mirror.shadow_links(n).unwrap(), Some(expected));
    }

    assert_eq!(mirror.len().unwrap(), registered.len());
}

/// One opaque color per texel.
fn palette(n: u32) -> RgbaImage {
    RgbaImage::from_fn(n, 1, |x, _| {
        Rgba([(x * 8) as u8, (255 - x * 8) as u8, (x * 37 % 256) as u8, 255])
    })
}

#[test]
fn topology() {
    const COUNT: usize = 32;

    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut scene = Scene::new();
    let primary = SoftwareEngine::with_canvas(32, 32);
    let mut mirror = MirrorEngine::new(primary, &params(32, 32)).unwrap();
    let texture = mirror.load_texture(&palette(COUNT as u32)).unwrap();

    let root = scene.create();
    let mut nodes = vec![root];
    let mut transforms = vec![Affine::scale(32.0, 32.0)];
    for i in 1..COUNT {
        let n = scene.create();
        let parent = if rng.gen_bool(0.3) {
            root
        } else {
            nodes[rng.gen_range(0..i)]
        };

        scene.append_child(parent, n).unwrap();
        nodes.push(n);

        let (x, y) = (rng.gen_range(0.0..0.5), rng.gen_range(0.0..0.5));
        transforms.push(Affine::translate(x, y) * Affine::scale(0.5, 0.5));
    }

    // Every node draws its own texel, so the frame tells which nodes were walked.
    let register = |mirror: &mut MirrorEngine<SoftwareEngine>, scene: &mut Scene, i: usize| {
        let n = nodes[i];
        let region = Rect::from_corners(i as i32, 0, i as i32 + 1, 1);
        mirror.register(scene, n).unwrap();
        mirror.set_sub_tex(n, SubTex::new(texture, region)).unwrap();
        mirror.set_transform(n, transforms[i]).unwrap();
        n
    };

    let mut registered = HashSet::new();
    registered.insert(register(&mut mirror, &mut scene, 0));

    for round in 0..16 {
        for _ in 0..24 {
            let i = rng.gen_range(1..COUNT);
            if registered.remove(&nodes[i]) {
                mirror.unregister(&mut scene, nodes[i]).unwrap();
            } else {
                registered.insert(register(&mut mirror, &mut scene, i));
            }
        }

        // Rearranges the primary graph between frames.
        let n = nodes[rng.gen_range(1..COUNT)];
        if let Some(parent) = scene.parent(n) {
            scene.remove_child(parent, n).unwrap();
            scene.append_child(root, n).unwrap();
        }

        for v in mirror.primary_mut().canvas_mut().pixels_mut() {
            *v = WHITE;
        }

        render(&mut mirror, &mut scene, root, round);
        check_topology(&scene, &mirror, &nodes, &registered);

        // Both backends walked the same nodes in the same order.
        let frame = mirror.snapshot().to_image().unwrap();
        assert!(*mirror.primary().canvas() == frame, "round {}", round);
    }

    assert_eq!(mirror.frames(), 16);
}

#[test]
fn registration_misuse() {
    let mut scene = Scene::new();
    let mut mirror = headless_mirror(8, 8);

    let n = scene.create();
    mirror.register(&mut scene, n).unwrap();

    match mirror.register(&mut scene, n) {
        Err(Error::NodeAlreadyRegistered(v)) => assert_eq!(v, n),
        _ => panic!("registered twice."),
    }

    let other = scene.create();
    match mirror.set_transform(other, Affine::identity()) {
        Err(Error::NodeNotRegistered(v)) => assert_eq!(v, other),
        _ => panic!("mirrored an unregistered node."),
    }

    assert!(mirror.unregister(&mut scene, other).is_err());

    // The primary rejects nodes that are not in the scene, and nothing is
    // mirrored then.
    scene.delete(other).unwrap();
    match mirror.register(&mut scene, other) {
        Err(Error::NodeHandleInvalid(v)) => assert_eq!(v, other),
        _ => panic!("registered a deleted node."),
    }

    assert_eq!(mirror.shadow_node(other).unwrap(), None);
    assert_eq!(mirror.len().unwrap(), 1);

    // Rendering an unregistered root aborts the frame.
    let root = scene.create();
    match mirror.render(&mut scene, root, Time(0), &DisplayConfig::default()) {
        Err(Error::NodeNotRegistered(v)) => assert_eq!(v, root),
        _ => panic!("rendered an unregistered root."),
    }

    assert_eq!(mirror.frames(), 0);
}

#[test]
fn stale_registration() {
    let mut scene = Scene::new();
    let mut mirror = headless_mirror(8, 8);

    let root = scene.create();
    let n = scene.create();
    scene.append_child(root, n).unwrap();
    mirror.register(&mut scene, root).unwrap();
    mirror.register(&mut scene, n).unwrap();

    // Deleted without being unregistered first.
    scene.delete(n).unwrap();
    render(&mut mirror, &mut scene, root, 0);

    assert_eq!(mirror.shadow_links(n).unwrap(), Some(Links::default()));
    assert_eq!(mirror.shadow_links(root).unwrap(), Some(Links::default()));
}

#[test]
fn textures() {
    let mut scene = Scene::new();
    let mut mirror = headless_mirror(8, 8);

    let n = scene.create();
    mirror.register(&mut scene, n).unwrap();

    let t1 = mirror.load_texture(&RgbaImage::from_pixel(2, 2, RED)).unwrap();
    let t2 = mirror.load_texture(&RgbaImage::from_pixel(2, 2, BLUE)).unwrap();

    let s1 = mirror.shadow_texture(t1).unwrap().unwrap();
    let s2 = mirror.shadow_texture(t2).unwrap().unwrap();
    assert_ne!(s1, s2);

    let region = Rect::from_corners(0, 0, 1, 1);
    mirror.set_sub_tex(n, SubTex::new(t2, region)).unwrap();

    let shadow = mirror.shadow_node(n).unwrap().unwrap();
    let (sub_tex, pixel) = mirror
        .with_shadow_engine(|v| {
            let sub_tex = v.state(shadow).unwrap().sub_tex.unwrap();
            let pixel = *v.texture(sub_tex.texture).unwrap().get_pixel(0, 0);
            (sub_tex, pixel)
        })
        .unwrap();

    assert_eq!(sub_tex, SubTex::new(s2, region));
    assert_eq!(pixel, BLUE);
    assert_eq!(
        mirror.primary().state(n).unwrap().sub_tex,
        Some(SubTex::new(t2, region))
    );
}

#[test]
fn empty_texture() {
    let mut scene = Scene::new();
    let mut mirror = headless_mirror(8, 8);

    let n = scene.create();
    mirror.register(&mut scene, n).unwrap();

    match mirror.load_texture(&RgbaImage::new(0, 0)) {
        Err(Error::TextureEmpty(0, 0)) => {}
        _ => panic!("loaded an empty image."),
    }

    let missing = TextureHandle::default();
    assert_eq!(mirror.shadow_texture(missing).unwrap(), None);

    let sub_tex = SubTex::new(missing, Rect::from_corners(0, 0, 1, 1));
    match mirror.set_sub_tex(n, sub_tex) {
        Err(Error::TextureHandleInvalid(v)) => assert_eq!(v, missing),
        _ => panic!("assigned a texture that was never loaded."),
    }

    assert_eq!(mirror.primary().state(n).unwrap().sub_tex, None);
}

#[test]
fn arrangers() {
    let mut scene = Scene::new();
    let mut mirror = headless_mirror(8, 8);

    let fired = Arc::new(AtomicUsize::new(0));
    let root = scene.create();
    {
        let fired = fired.clone();
        scene
            .set_arranger(root, move |e: &mut dyn Engine, n: NodeHandle, t: Time| -> Result<()> {
                fired.fetch_add(1, Ordering::SeqCst);
                e.set_transform(n, Affine::translate(t.0 as f32, 0.0))
            })
            .unwrap();
    }

    mirror.register(&mut scene, root).unwrap();
    assert!(scene.is_arranger_mirrored(root));

    for t in 1..4 {
        render(&mut mirror, &mut scene, root, t);
        assert_eq!(fired.load(Ordering::SeqCst), t as usize);
    }

    // Registering again never stacks another layer.
    mirror.unregister(&mut scene, root).unwrap();
    mirror.register(&mut scene, root).unwrap();
    render(&mut mirror, &mut scene, root, 7);
    assert_eq!(fired.load(Ordering::SeqCst), 4);

    // Mutations issued by the arranger reach both backends.
    let expected = Affine::translate(7.0, 0.0);
    let shadow = mirror.shadow_node(root).unwrap().unwrap();
    assert_eq!(mirror.primary().state(root).unwrap().transform, expected);
    assert_eq!(
        mirror
            .with_shadow_engine(|v| v.state(shadow).unwrap().transform)
            .unwrap(),
        expected
    );
}

#[test]
fn nested_render() {
    let mut scene = Scene::new();
    let mut mirror = headless_mirror(8, 8);

    let root = scene.create();
    let mut inner = Scene::new();
    let inner_root = inner.create();
    scene
        .set_arranger(root, move |e: &mut dyn Engine, _: NodeHandle, t: Time| -> Result<()> {
            e.render(&mut inner, inner_root, t, &DisplayConfig::default())
        })
        .unwrap();

    mirror.register(&mut scene, root).unwrap();
    match mirror.render(&mut scene, root, Time(0), &DisplayConfig::default()) {
        Err(Error::NestedRender) => {}
        _ => panic!("rendered from inside an arranger."),
    }
}

#[test]
fn mirror_dropped() {
    let mut scene = Scene::new();
    let root = scene.create();
    scene
        .set_arranger(root, |e: &mut dyn Engine, n: NodeHandle, _: Time| -> Result<()> {
            e.set_transform(n, Affine::scale(2.0, 2.0))
        })
        .unwrap();

    {
        let mut mirror = headless_mirror(8, 8);
        mirror.register(&mut scene, root).unwrap();
    }

    // The wrapped arranger passes the engine it receives straight through.
    assert!(scene.is_arranger_mirrored(root));
    let mut engine = HeadlessEngine::new();
    engine.register(&mut scene, root).unwrap();
    engine
        .render(&mut scene, root, Time(0), &DisplayConfig::default())
        .unwrap();

    assert_eq!(
        engine.state(root).unwrap().transform,
        Affine::scale(2.0, 2.0)
    );
}

fn two_tone(w: u32, h: u32) -> RgbaImage {
    RgbaImage::from_fn(w, h, |x, y| if x < w / 2 && y < h / 2 { RED } else { BLUE })
}

#[test]
fn draw() {
    let mut scene = Scene::new();
    let mut mirror = headless_mirror(20, 20);

    let r = scene.create();
    let c = scene.create();
    mirror.register(&mut scene, r).unwrap();
    mirror.register(&mut scene, c).unwrap();
    scene.append_child(r, c).unwrap();

    let t = mirror.load_texture(&two_tone(20, 20)).unwrap();
    mirror
        .set_sub_tex(c, SubTex::new(t, Rect::from_corners(0, 0, 10, 10)))
        .unwrap();
    mirror
        .set_transform(c, Affine([[10.0, 0.0, 5.0], [0.0, 10.0, 5.0]]))
        .unwrap();

    render(&mut mirror, &mut scene, r, 0);

    let frame = mirror.snapshot().to_image().unwrap();
    for (x, y, v) in frame.enumerate_pixels() {
        if x >= 5 && x < 15 && y >= 5 && y < 15 {
            assert_eq!(*v, RED, "({}, {})", x, y);
        } else {
            assert_eq!(*v, WHITE, "({}, {})", x, y);
        }
    }

    // Nothing is left from the previous frame.
    mirror
        .set_transform(c, Affine([[10.0, 0.0, 0.0], [0.0, 10.0, 0.0]]))
        .unwrap();
    render(&mut mirror, &mut scene, r, 1);

    let frame = mirror.snapshot().to_image().unwrap();
    assert_eq!(*frame.get_pixel(0, 0), RED);
    assert_eq!(*frame.get_pixel(9, 9), RED);
    assert_eq!(*frame.get_pixel(12, 12), WHITE);

    // Unregistered nodes vanish from the next frame.
    mirror.unregister(&mut scene, c).unwrap();
    render(&mut mirror, &mut scene, r, 2);

    let frame = mirror.snapshot().to_image().unwrap();
    assert!(frame.pixels().all(|v| *v == WHITE));
}

#[test]
fn draw_with_software_primary() {
    let mut scene = Scene::new();
    let primary = SoftwareEngine::with_canvas(4, 4);
    let mut mirror = MirrorEngine::new(primary, &params(4, 4)).unwrap();

    let n = scene.create();
    mirror.register(&mut scene, n).unwrap();

    let t = mirror.load_texture(&RgbaImage::from_pixel(1, 1, RED)).unwrap();
    mirror
        .set_sub_tex(n, SubTex::new(t, Rect::from_corners(0, 0, 1, 1)))
        .unwrap();
    mirror.set_transform(n, Affine::scale(2.0, 2.0)).unwrap();
    render(&mut mirror, &mut scene, n, 0);

    // Both backends drew the same picture.
    let frame = mirror.snapshot().to_image().unwrap();
    let canvas = mirror.primary().canvas();
    for (x, y, v) in frame.enumerate_pixels() {
        if x < 2 && y < 2 {
            assert_eq!(*v, RED);
            assert_eq!(*canvas.get_pixel(x, y), RED);
        } else {
            assert_eq!(*v, WHITE);
        }
    }
}

#[test]
fn unregistered_sibling() {
    let mut scene = Scene::new();
    let primary = SoftwareEngine::with_canvas(4, 4);
    let mut mirror = MirrorEngine::new(primary, &params(4, 4)).unwrap();

    let root = scene.create();
    let a = scene.create();
    let hidden = scene.create();
    let b = scene.create();
    for &n in &[a, hidden, b] {
        scene.append_child(root, n).unwrap();
    }

    for &n in &[root, a, b] {
        mirror.register(&mut scene, n).unwrap();
    }

    let t = mirror.load_texture(&RgbaImage::from_pixel(1, 1, RED)).unwrap();
    mirror
        .set_sub_tex(b, SubTex::new(t, Rect::from_corners(0, 0, 1, 1)))
        .unwrap();
    mirror.set_transform(b, Affine::scale(4.0, 4.0)).unwrap();
    render(&mut mirror, &mut scene, root, 0);

    // The sibling after the unregistered node is still drawn by both.
    let frame = mirror.snapshot().to_image().unwrap();
    assert!(frame.pixels().all(|v| *v == RED));
    assert_eq!(*mirror.primary().canvas(), frame);

    let links = mirror.shadow_links(a).unwrap().unwrap();
    assert_eq!(links.next_sib, mirror.shadow_node(b).unwrap());
    let links = mirror.shadow_links(b).unwrap().unwrap();
    assert_eq!(links.prev_sib, mirror.shadow_node(a).unwrap());
}

#[test]
fn overflowing_region() {
    let mut scene = Scene::new();
    let primary = SoftwareEngine::with_canvas(4, 4);
    let mut mirror = MirrorEngine::new(primary, &params(4, 4)).unwrap();

    let n = scene.create();
    mirror.register(&mut scene, n).unwrap();
    mirror.set_transform(n, Affine::scale(4.0, 4.0)).unwrap();
    let t = mirror.load_texture(&RgbaImage::from_pixel(1, 1, RED)).unwrap();

    let region = Rect::from_corners(std::i32::MIN, 0, std::i32::MAX, 1);
    match mirror.set_sub_tex(n, SubTex::new(t, region)) {
        Err(Error::RegionInvalid(v)) => assert_eq!(v, region),
        _ => panic!("accepted an overflowing region."),
    }

    assert_eq!(mirror.primary().state(n).unwrap().sub_tex, None);

    // Frames keep being drawn and read.
    render(&mut mirror, &mut scene, n, 0);
    let frame = mirror.snapshot().to_image().unwrap();
    assert!(frame.pixels().all(|v| *v == WHITE));
}

/// A shadow backend whose calls could be made to fail on demand.
struct FlakyEngine {
    inner: SoftwareEngine,
    fail_register: Arc<AtomicBool>,
    fail_transform: Arc<AtomicBool>,
}

impl FlakyEngine {
    fn check(flag: &AtomicBool) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            Err(Error::Io("flaky".to_owned()))
        } else {
            Ok(())
        }
    }
}

impl Engine for FlakyEngine {
    fn register(&mut self, scene: &mut Scene, node: NodeHandle) -> Result<()> {
        Self::check(&self.fail_register)?;
        self.inner.register(scene, node)
    }

    fn unregister(&mut self, scene: &mut Scene, node: NodeHandle) -> Result<()> {
        self.inner.unregister(scene, node)
    }

    fn load_texture(&mut self, image: &RgbaImage) -> Result<TextureHandle> {
        self.inner.load_texture(image)
    }

    fn set_sub_tex(&mut self, node: NodeHandle, sub_tex: SubTex) -> Result<()> {
        self.inner.set_sub_tex(node, sub_tex)
    }

    fn set_transform(&mut self, node: NodeHandle, transform: Affine) -> Result<()> {
        Self::check(&self.fail_transform)?;
        self.inner.set_transform(node, transform)
    }

    fn render(
        &mut self,
        scene: &mut Scene,
        root: NodeHandle,
        time: Time,
        config: &DisplayConfig,
    ) -> Result<()> {
        self.inner.render(scene, root, time, config)
    }
}

impl RasterEngine for FlakyEngine {
    fn render_into(
        &mut self,
        scene: &mut Scene,
        root: NodeHandle,
        time: Time,
        config: &DisplayConfig,
        dst: &mut RgbaImage,
    ) -> Result<()> {
        self.inner.render_into(scene, root, time, config, dst)
    }
}

#[test]
fn shadow_failures() {
    let fail_register = Arc::new(AtomicBool::new(false));
    let fail_transform = Arc::new(AtomicBool::new(false));
    let shadow = FlakyEngine {
        inner: SoftwareEngine::new(),
        fail_register: fail_register.clone(),
        fail_transform: fail_transform.clone(),
    };

    let mut scene = Scene::new();
    let mut mirror = MirrorEngine::with_shadow(HeadlessEngine::new(), shadow, &params(4, 4)).unwrap();

    let n = scene.create();
    mirror.register(&mut scene, n).unwrap();

    // The primary keeps the new transform, the shadow does not.
    fail_transform.store(true, Ordering::SeqCst);
    let transform = Affine::scale(3.0, 3.0);
    match mirror.set_transform(n, transform) {
        Err(Error::Shadow(cause)) => match *cause {
            Error::Io(_) => {}
            _ => panic!("unexpected shadow error."),
        },
        _ => panic!("shadow failure was swallowed."),
    }

    assert_eq!(mirror.primary().state(n).unwrap().transform, transform);

    // No identity entry is recorded for a node the shadow refused.
    fail_register.store(true, Ordering::SeqCst);
    let m = scene.create();
    let err = mirror.register(&mut scene, m).unwrap_err();
    assert!(err.shadow_cause().is_some());
    assert!(mirror.primary().is_registered(m));
    assert_eq!(mirror.shadow_node(m).unwrap(), None);
    assert_eq!(mirror.len().unwrap(), 1);

    // The mirror can not tidy up after the refused node, the primary can.
    fail_register.store(false, Ordering::SeqCst);
    match mirror.register(&mut scene, m) {
        Err(Error::NodeAlreadyRegistered(v)) => assert_eq!(v, m),
        _ => panic!("registered a node twice on the primary."),
    }

    match mirror.unregister(&mut scene, m) {
        Err(Error::NodeNotRegistered(v)) => assert_eq!(v, m),
        _ => panic!("unregistered a node without a shadow."),
    }

    mirror.primary_mut().unregister(&mut scene, m).unwrap();
    mirror.register(&mut scene, m).unwrap();
    assert!(mirror.shadow_node(m).unwrap().is_some());
    assert_eq!(mirror.len().unwrap(), 2);
}

#[test]
fn invalid_params() {
    assert!(MirrorEngine::new(HeadlessEngine::new(), &params(0, 4)).is_err());
}
