//! Re-balancing steps for [Tree]. Every function here is called by the
//! writer, holding the writer lock, hence links and colors can be loaded
//! without latching. Stores happen only through [Exclusive], that latches
//! the neighbourhood of a step top-down.

use crate::{
    arena::Writer,
    latch::Exclusive,
    node::{Color, NodeId, HEAD, NIL},
    Tree,
};

impl<K, V, C> Tree<K, V, C> {
    #[inline]
    fn parent(&self, id: NodeId) -> NodeId {
        self.arena.get(id).to_parent()
    }

    #[inline]
    fn left(&self, id: NodeId) -> NodeId {
        self.arena.get(id).to_left()
    }

    #[inline]
    fn right(&self, id: NodeId) -> NodeId {
        self.arena.get(id).to_right()
    }

    #[inline]
    fn is_red(&self, id: NodeId) -> bool {
        self.arena.get(id).is_red()
    }

    #[inline]
    fn color(&self, id: NodeId) -> Color {
        self.arena.get(id).to_color()
    }

    // latch guarding the link that points to `id`.
    #[inline]
    fn up(&self, id: NodeId) -> NodeId {
        match self.parent(id) {
            NIL => HEAD,
            parent => parent,
        }
    }

    fn lock(&self, ids: &[NodeId]) -> Exclusive<K, V> {
        Exclusive::acquire(&self.head, &self.arena, ids)
    }

    // ids shall be listed top-down.
    fn paint(&self, colors: &[(NodeId, Color)]) {
        let ids: Vec<NodeId> = colors.iter().map(|(id, _)| *id).collect();
        let mut ex = self.lock(&ids);
        for (id, color) in colors.iter() {
            ex.set_color(*id, *color);
        }
    }

    //              (p)                       (p)
    //               |                         |
    //               x                         y
    //              / \                       / \
    //             a   y                     x   c
    //                / \                   / \
    //               b   c                 a   b
    //
    pub(crate) fn rotate_left(&self, x: NodeId) {
        let (p, y) = (self.parent(x), self.right(x));
        debug_assert!(y != NIL, "rotate_left on {} without right child", x);
        let b = self.left(y);

        let mut ex = self.lock(&[self.up(x), x, y, b]);
        ex.set_right(x, b);
        ex.set_parent(b, x);
        ex.set_parent(y, p);
        ex.replace_child(p, x, y);
        ex.set_left(y, x);
        ex.set_parent(x, y);
    }

    //              (p)                       (p)
    //               |                         |
    //               x                         y
    //              / \                       / \
    //             y   c                     a   x
    //            / \                           / \
    //           a   b                         b   c
    //
    pub(crate) fn rotate_right(&self, x: NodeId) {
        let (p, y) = (self.parent(x), self.left(x));
        debug_assert!(y != NIL, "rotate_right on {} without left child", x);
        let b = self.right(y);

        let mut ex = self.lock(&[self.up(x), x, y, b]);
        ex.set_left(x, b);
        ex.set_parent(b, x);
        ex.set_parent(y, p);
        ex.replace_child(p, x, y);
        ex.set_right(y, x);
        ex.set_parent(x, y);
    }

    /// Restore red-black invariants after `z` is linked as a red leaf.
    pub(crate) fn insert_fixup(&self, mut z: NodeId) {
        while self.is_red(self.parent(z)) {
            let zp = self.parent(z);
            // red parent is never the root, hence grand-parent is real.
            let zpp = self.parent(zp);

            if zp == self.left(zpp) {
                let uncle = self.right(zpp);
                if self.is_red(uncle) {
                    self.paint(&[(zpp, Color::Red), (zp, Color::Black), (uncle, Color::Black)]);
                    z = zpp;
                    continue;
                }
                if z == self.right(zp) {
                    z = zp;
                    self.rotate_left(z);
                }
                let (zp, zpp) = (self.parent(z), self.parent(self.parent(z)));
                self.paint(&[(zpp, Color::Red), (zp, Color::Black)]);
                self.rotate_right(zpp);
            } else {
                let uncle = self.left(zpp);
                if self.is_red(uncle) {
                    self.paint(&[(zpp, Color::Red), (zp, Color::Black), (uncle, Color::Black)]);
                    z = zpp;
                    continue;
                }
                if z == self.left(zp) {
                    z = zp;
                    self.rotate_right(z);
                }
                let (zp, zpp) = (self.parent(z), self.parent(self.parent(z)));
                self.paint(&[(zpp, Color::Red), (zp, Color::Black)]);
                self.rotate_left(zpp);
            }
        }

        let root = self.to_root();
        if self.is_red(root) {
            self.paint(&[(root, Color::Black)]);
        }
    }

    /// Unlink node `z` from the tree, its payload is dropped and its slot
    /// released while `z` and its parent are latched. Return the node that
    /// took the place of the removed color, its parent, and the removed
    /// color.
    pub(crate) fn splice(&self, w: &mut Writer, z: NodeId) -> (NodeId, NodeId, Color) {
        let (zp, zl, zr) = (self.parent(z), self.left(z), self.right(z));

        if zl == NIL || zr == NIL {
            let x = if zl == NIL { zr } else { zl };
            let removed = self.color(z);

            let mut ex = self.lock(&[self.up(z), z, x]);
            ex.replace_child(zp, z, x);
            ex.set_parent(x, zp);
            let _payload = ex.take(z);
            self.arena.release(w, z);
            return (x, zp, removed);
        }

        // successor, left most node in the right sub-tree.
        let mut y = zr;
        while self.left(y) != NIL {
            y = self.left(y);
        }
        let (yp, x, removed) = (self.parent(y), self.right(y), self.color(y));

        //          (zp)                     (zp)
        //           |                        |
        //           z                        y
        //          / \                      / \
        //        zl   zr      ==>         zl   zr
        //             /                        /
        //           yp                       yp
        //           /                        /
        //          y                        x
        //           \
        //            x
        //
        let (mut ex, xp) = if yp == z {
            (self.lock(&[self.up(z), z, zl, y, x]), y)
        } else {
            let mut ex = self.lock(&[self.up(z), z, zl, zr, yp, y, x]);
            ex.set_left(yp, x);
            ex.set_parent(x, yp);
            ex.set_right(y, zr);
            ex.set_parent(zr, y);
            (ex, yp)
        };
        ex.replace_child(zp, z, y);
        ex.set_parent(y, zp);
        ex.set_left(y, zl);
        ex.set_parent(zl, y);
        ex.set_color(y, self.color(z));

        let _payload = ex.take(z);
        self.arena.release(w, z);
        (x, xp, removed)
    }

    /// Restore red-black invariants after a black node is removed. `x`
    /// carries the extra black, `xp` is its parent, tracked separately
    /// since `x` may be the sentinel.
    pub(crate) fn delete_fixup(&self, mut x: NodeId, mut xp: NodeId) {
        while x != self.to_root() && !self.is_red(x) {
            if x == self.left(xp) {
                let mut s = self.right(xp);
                if self.is_red(s) {
                    self.paint(&[(xp, Color::Red), (s, Color::Black)]);
                    self.rotate_left(xp);
                    s = self.right(xp);
                }
                if !self.is_red(self.left(s)) && !self.is_red(self.right(s)) {
                    self.paint(&[(s, Color::Red)]);
                    x = xp;
                    xp = self.parent(x);
                    continue;
                }
                if !self.is_red(self.right(s)) {
                    self.paint(&[(s, Color::Red), (self.left(s), Color::Black)]);
                    self.rotate_right(s);
                    s = self.right(xp);
                }
                let colors = [
                    (xp, Color::Black),
                    (s, self.color(xp)),
                    (self.right(s), Color::Black),
                ];
                self.paint(&colors);
                self.rotate_left(xp);
            } else {
                let mut s = self.left(xp);
                if self.is_red(s) {
                    self.paint(&[(xp, Color::Red), (s, Color::Black)]);
                    self.rotate_right(xp);
                    s = self.left(xp);
                }
                if !self.is_red(self.left(s)) && !self.is_red(self.right(s)) {
                    self.paint(&[(s, Color::Red)]);
                    x = xp;
                    xp = self.parent(x);
                    continue;
                }
                if !self.is_red(self.left(s)) {
                    self.paint(&[(s, Color::Red), (self.right(s), Color::Black)]);
                    self.rotate_left(s);
                    s = self.left(xp);
                }
                let colors = [
                    (xp, Color::Black),
                    (s, self.color(xp)),
                    (self.left(s), Color::Black),
                ];
                self.paint(&colors);
                self.rotate_right(xp);
            }
            x = self.to_root();
        }

        if x != NIL && self.is_red(x) {
            self.paint(&[(x, Color::Black)]);
        }
    }
}

#[cfg(test)]
#[path = "fixup_test.rs"]
mod fixup_test;
