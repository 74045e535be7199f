// Copyright 2026 Andrew Conway.
// This file is part of ConcreteSTV.
// ConcreteSTV is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteSTV is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.


//! Exact counting of combinations and permutations, used to refuse enumerations that would never finish.

use std::fmt;
use num::{BigUint, ToPrimitive};
use crate::errors::CondorcetError;

/// A way of computing counts. None means the answer does not fit in an i64.
/// Arguments have already been checked to be valid, with k ≤ n/2 for combinations.
pub trait CountingBackend {
    fn name(&self) -> &'static str;
    fn combinations(&self,n:u64,k:u64) -> Option<i64>;
    fn factorial(&self,n:u64) -> Option<i64>;
}

/// Arbitrary precision, narrowed to an i64 at the end.
#[derive(Clone,Copy,Debug,Default)]
pub struct BigIntegerBackend;

/// u128 arithmetic with every step checked.
#[derive(Clone,Copy,Debug,Default)]
pub struct NativeBackend;

impl CountingBackend for BigIntegerBackend {
    fn name(&self) -> &'static str { "big integer" }
    fn combinations(&self,n:u64,k:u64) -> Option<i64> {
        let mut res = BigUint::from(1u32);
        for i in 0..k {
            res = res*BigUint::from(n-i)/BigUint::from(i+1); // exact, as res is now C(n,i+1)
            // C(n,i) increases with i for i ≤ n/2, so once too big it stays too big.
            res.to_i64()?;
        }
        res.to_i64()
    }
    fn factorial(&self,n:u64) -> Option<i64> {
        let mut res = BigUint::from(1u32);
        for i in 2..=n {
            res*=BigUint::from(i);
            res.to_i64()?;
        }
        res.to_i64()
    }
}

impl CountingBackend for NativeBackend {
    fn name(&self) -> &'static str { "native" }
    fn combinations(&self,n:u64,k:u64) -> Option<i64> {
        let mut res : u128 = 1;
        for i in 0..k {
            res = res.checked_mul((n-i) as u128)?/((i+1) as u128);
            if res>i64::MAX as u128 { return None; }
        }
        i64::try_from(res).ok()
    }
    fn factorial(&self,n:u64) -> Option<i64> {
        let mut res : i64 = 1;
        for i in 2..=n {
            res = res.checked_mul(i64::try_from(i).ok()?)?;
        }
        Some(res)
    }
}

/// Checked counting, used to bound enumerations of committees or orderings.
pub struct CombinatoricsGuard {
    backend : Box<dyn CountingBackend>,
}

impl fmt::Debug for CombinatoricsGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f,"CombinatoricsGuard({})",self.backend.name())
    }
}

impl Default for CombinatoricsGuard {
    fn default() -> Self { CombinatoricsGuard::new(true) }
}

impl CombinatoricsGuard {
    pub fn new(use_big_integer:bool) -> Self {
        if use_big_integer { Self::with_backend(Box::new(BigIntegerBackend)) } else { Self::with_backend(Box::new(NativeBackend)) }
    }
    pub fn with_backend(backend:Box<dyn CountingBackend>) -> Self { CombinatoricsGuard{backend} }
    pub fn backend_name(&self) -> &'static str { self.backend.name() }

    /// n choose k. Fails with Domain if n<0, k<0 or k>n, and Overflow if the answer does not fit in an i64.
    pub fn combinations(&self,n:i64,k:i64) -> Result<i64,CondorcetError> {
        if n<0 || k<0 { return Err(CondorcetError::Domain(format!("combinations({},{}) needs non-negative arguments",n,k))); }
        if k>n { return Err(CondorcetError::Domain(format!("combinations({},{}) needs k ≤ n",n,k))); }
        let (n,k) = (n as u64,k as u64);
        self.backend.combinations(n,k.min(n-k)).ok_or(CondorcetError::Overflow)
    }

    /// n!, the number of orderings of n things. Fails with Domain if n<1, and Overflow if the answer does not fit in an i64.
    pub fn permutations(&self,n:i64) -> Result<i64,CondorcetError> {
        if n<1 { return Err(CondorcetError::Domain(format!("permutations({}) needs at least one item",n))); }
        self.backend.factorial(n as u64).ok_or(CondorcetError::Overflow)
    }

    /// Fail if count is more than the limit (if any).
    pub fn check_enumeration(&self,count:i64,limit:Option<u64>) -> Result<(),CondorcetError> {
        match limit {
            Some(limit) if count<0 || count as u64>limit => Err(CondorcetError::CapacityExceeded{ needed: count.max(0) as u64, limit }),
            _ => Ok(()),
        }
    }

    /// All k element subsets of 0..n, if there are not more than `limit` of them.
    pub fn k_subsets(&self,n:usize,k:usize,limit:Option<u64>) -> Result<KSubsets,CondorcetError> {
        let count = self.combinations(n as i64,k as i64)?;
        self.check_enumeration(count,limit)?;
        Ok(KSubsets::new(n,k))
    }

    /// All orderings of `items`, if there are not more than `limit` of them.
    pub fn orderings<T:Clone>(&self,items:Vec<T>,limit:Option<u64>) -> Result<Orderings<T>,CondorcetError> {
        let count = self.permutations(items.len() as i64)?;
        self.check_enumeration(count,limit)?;
        Ok(Orderings::new(items))
    }
}

/// n choose k using arbitrary precision arithmetic.
pub fn combinations(n:i64,k:i64) -> Result<i64,CondorcetError> { CombinatoricsGuard::default().combinations(n,k) }
/// n! using arbitrary precision arithmetic.
pub fn permutations(n:i64) -> Result<i64,CondorcetError> { CombinatoricsGuard::default().permutations(n) }

/// The k element subsets of 0..n, each in increasing order, in lexicographic order.
#[derive(Clone,Debug)]
pub struct KSubsets {
    n : usize,
    current : Option<Vec<usize>>,
}

impl KSubsets {
    fn new(n:usize,k:usize) -> Self {
        KSubsets{ n, current: if k<=n { Some((0..k).collect()) } else { None } }
    }
}

impl Iterator for KSubsets {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let res = self.current.take()?;
        let k = res.len();
        let mut next = res.clone();
        // find the rightmost element that can still move right.
        if let Some(i) = (0..k).rev().find(|&i|next[i]<self.n-k+i) {
            next[i]+=1;
            for j in i+1..k { next[j]=next[j-1]+1; }
            self.current=Some(next);
        }
        Some(res)
    }
}

/// Every ordering of some items, in lexicographic order of the original positions.
#[derive(Clone,Debug)]
pub struct Orderings<T> {
    items : Vec<T>,
    current : Option<Vec<usize>>,
}

impl <T:Clone> Orderings<T> {
    fn new(items:Vec<T>) -> Self {
        let current = Some((0..items.len()).collect());
        Orderings{ items, current }
    }
}

impl <T:Clone> Iterator for Orderings<T> {
    type Item = Vec<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let indices = self.current.take()?;
        let res = indices.iter().map(|&i|self.items[i].clone()).collect();
        let mut next = indices;
        if let Some(i) = (1..next.len()).rev().find(|&i|next[i-1]<next[i]).map(|i|i-1) {
            let j = (i+1..next.len()).rev().find(|&j|next[j]>next[i]).unwrap_or(i+1);
            next.swap(i,j);
            next[i+1..].reverse();
            self.current=Some(next);
        }
        Some(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn both() -> [CombinatoricsGuard;2] { [CombinatoricsGuard::new(true),CombinatoricsGuard::new(false)] }

    #[test]
    fn test_combinations() {
        for guard in both() {
            assert_eq!(1,guard.combinations(0,0).unwrap());
            assert_eq!(10,guard.combinations(5,2).unwrap());
            assert_eq!(2598960,guard.combinations(52,5).unwrap());
            assert_eq!(4367914309753280,guard.combinations(78,15).unwrap());
            assert_eq!(212566476905162380,guard.combinations(78,18).unwrap());
            assert_eq!(7219428434016265740,guard.combinations(66,33).unwrap());
            assert!(matches!(guard.combinations(78,24),Err(CondorcetError::Overflow)));
            assert!(matches!(guard.combinations(68,34),Err(CondorcetError::Overflow)));
            assert!(matches!(guard.combinations(i64::MAX-1,2),Err(CondorcetError::Overflow)));
            assert_eq!(13530,guard.combinations(guard.combinations(11,3).unwrap(),2).unwrap());
            assert_eq!(i64::MAX,guard.combinations(i64::MAX,1).unwrap());
            assert_eq!(1,guard.combinations(i64::MAX,i64::MAX).unwrap());
        }
    }

    #[test]
    fn test_symmetry() {
        for guard in both() {
            for n in 0..70 {
                for k in 0..=n {
                    match (guard.combinations(n,k),guard.combinations(n,n-k)) {
                        (Ok(a),Ok(b)) => assert_eq!(a,b),
                        (Err(CondorcetError::Overflow),Err(CondorcetError::Overflow)) => {}
                        other => panic!("Asymmetric result for {} {} : {:?}",n,k,other),
                    }
                }
            }
        }
    }

    #[test]
    fn test_domain() {
        for guard in both() {
            assert!(matches!(guard.combinations(2,3),Err(CondorcetError::Domain(_))));
            assert!(matches!(guard.combinations(-1,0),Err(CondorcetError::Domain(_))));
            assert!(matches!(guard.combinations(3,-1),Err(CondorcetError::Domain(_))));
            assert!(matches!(guard.permutations(0),Err(CondorcetError::Domain(_))));
        }
    }

    #[test]
    fn test_permutations() {
        for guard in both() {
            assert_eq!(1,guard.permutations(1).unwrap());
            assert_eq!(120,guard.permutations(5).unwrap());
            assert_eq!(2432902008176640000,guard.permutations(20).unwrap());
            assert!(matches!(guard.permutations(21),Err(CondorcetError::Overflow)));
        }
        assert_eq!(6,permutations(3).unwrap());
        assert_eq!(120,combinations(10,3).unwrap());
    }

    #[test]
    fn test_k_subsets() {
        let guard = CombinatoricsGuard::default();
        let subsets : Vec<Vec<usize>> = guard.k_subsets(4,2,None).unwrap().collect();
        assert_eq!(vec![vec![0,1],vec![0,2],vec![0,3],vec![1,2],vec![1,3],vec![2,3]],subsets);
        assert_eq!(vec![Vec::<usize>::new()],guard.k_subsets(3,0,None).unwrap().collect::<Vec<_>>());
        assert_eq!(120,guard.k_subsets(10,3,Some(120)).unwrap().count());
        assert!(matches!(guard.k_subsets(10,3,Some(119)),Err(CondorcetError::CapacityExceeded{needed:120,limit:119})));
    }

    #[test]
    fn test_orderings() {
        let guard = CombinatoricsGuard::default();
        let orders : Vec<Vec<char>> = guard.orderings(vec!['a','b','c'],None).unwrap().collect();
        assert_eq!(vec![vec!['a','b','c'],vec!['a','c','b'],vec!['b','a','c'],vec!['b','c','a'],vec!['c','a','b'],vec!['c','b','a']],orders);
        assert_eq!(24,guard.orderings(vec![1,2,3,4],Some(24)).unwrap().count());
        assert!(matches!(guard.orderings(vec![1,2,3,4],Some(23)),Err(CondorcetError::CapacityExceeded{..})));
        assert!(matches!(guard.orderings((0..25).collect(),Some(1000)),Err(CondorcetError::Overflow)));
    }
}
